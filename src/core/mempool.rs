//! Fixed-capacity block pool with generation-checked ids.
//!
//! All storage is reserved up front; [`Mempool::alloc`] never grows the pool
//! and fails with `NoSpace` once `capacity` blocks are live. Freed slots are
//! reused last-released-first. Every slot carries a generation that is bumped
//! on free, so a [`BlockId`] kept past its `free` can never address the block
//! that later reuses the slot.

use crate::core::error::{RecordErrno, TaskError, TaskResult};

/// Handle to a live block in a [`Mempool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId {
    index: u32,
    generation: u32,
}

impl BlockId {
    /// Slot index inside the pool.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this id was handed out.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

/// Fixed set of `capacity` blocks of `T`.
#[derive(Debug)]
pub struct Mempool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Mempool<T> {
    /// Reserve a pool of `capacity` blocks.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidArgument` if `capacity` is zero or does not
    /// fit the 32-bit index space.
    pub fn new(capacity: usize) -> TaskResult<Self> {
        if capacity == 0 {
            return Err(TaskError::InvalidArgument(
                "mempool capacity must be greater than 0".into(),
            ))
            .record();
        }
        let Ok(top) = u32::try_from(capacity) else {
            return Err(TaskError::InvalidArgument(format!(
                "mempool capacity {capacity} exceeds index space"
            )))
            .record();
        };

        let slots = (0..capacity).map(|_| Slot::Vacant { generation: 0 }).collect();
        // lowest index on top of the free stack
        let free = (0..top).rev().collect();
        Ok(Self {
            slots,
            free,
            live: 0,
        })
    }

    /// Total number of blocks.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live blocks.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// `true` if no block is live.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// `true` if every block is live.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Store `value` in a free block.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NoSpace` if all blocks are live; `value` is dropped.
    pub fn alloc(&mut self, value: T) -> TaskResult<BlockId> {
        let index = self.free.pop().ok_or(TaskError::NoSpace).record()?;
        let slot = &mut self.slots[index as usize];
        let generation = match slot {
            Slot::Vacant { generation } => *generation,
            Slot::Occupied { .. } => unreachable!("free list pointed at a live slot"),
        };
        *slot = Slot::Occupied { generation, value };
        self.live += 1;
        Ok(BlockId { index, generation })
    }

    /// Return the block behind `id` to the pool, yielding its value.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidArgument` if `id` is out of range or stale.
    pub fn free(&mut self, id: BlockId) -> TaskResult<T> {
        if self.get(id).is_none() {
            return Err(stale(id)).record();
        }
        let next = id.generation.wrapping_add(1);
        let old = std::mem::replace(
            &mut self.slots[id.index()],
            Slot::Vacant { generation: next },
        );
        self.free.push(id.index);
        self.live -= 1;
        match old {
            Slot::Occupied { value, .. } => Ok(value),
            Slot::Vacant { .. } => unreachable!("checked occupied above"),
        }
    }

    /// Borrow the value behind a live id.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&T> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Mutably borrow the value behind a live id.
    #[must_use]
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut T> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }
}

fn stale(id: BlockId) -> TaskError {
    TaskError::InvalidArgument(format!(
        "block {} (generation {}) is not live",
        id.index, id.generation
    ))
}
