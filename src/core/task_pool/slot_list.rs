//! A [`List`] of ids ordering values stored in a [`Mempool`].

use crate::core::error::TaskResult;
use crate::core::list::List;
use crate::core::mempool::{BlockId, Mempool};

/// Bounded ordered collection: the pool owns the values, the list their order.
#[derive(Debug)]
pub(crate) struct SlotList<T> {
    order: List<BlockId>,
    blocks: Mempool<T>,
}

impl<T> SlotList<T> {
    pub(crate) fn new(capacity: usize) -> TaskResult<Self> {
        Ok(Self {
            order: List::with_capacity(capacity),
            blocks: Mempool::new(capacity)?,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.blocks.capacity()
    }

    /// Fails with `NoSpace` when every block is in use.
    pub(crate) fn push_front(&mut self, value: T) -> TaskResult<()> {
        let id = self.blocks.alloc(value)?;
        self.order.push_front(id);
        Ok(())
    }

    /// Fails with `NoSpace` when every block is in use.
    pub(crate) fn push_back(&mut self, value: T) -> TaskResult<()> {
        let id = self.blocks.alloc(value)?;
        self.order.push_back(id);
        Ok(())
    }

    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let id = self.order.pop_back()?;
        self.blocks.free(id).ok()
    }

    pub(crate) fn pop_if<F>(&mut self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let blocks = &self.blocks;
        let id = self
            .order
            .pop_if(|id| blocks.get(*id).is_some_and(&mut pred))?;
        self.blocks.free(id).ok()
    }

    pub(crate) fn cycling_next(&mut self) -> Option<&T> {
        let id = *self.order.cycling_next()?;
        self.blocks.get(id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.blocks.get(*id))
    }

    /// Remove everything, front to back.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let ids: Vec<BlockId> = self.order.drain().collect();
        ids.into_iter()
            .filter_map(|id| self.blocks.free(id).ok())
            .collect()
    }
}
