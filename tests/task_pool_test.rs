//! Integration tests for TaskPool
//!
//! These tests validate real-world functionality including:
//! - Bounded queue with backpressure (`NoSpace`)
//! - Gated work items draining across several workers
//! - Worker count resizing
//! - Cycling delivery with pool-wide pause
//! - Concurrent submission
//! - Shutdown with stuck and queued work

use prometheus_taskpool::config::TaskPoolConfig;
use prometheus_taskpool::core::{TaskError, TaskPool, WorkItem};
use prometheus_taskpool::{Event, Timeout};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

fn pool_config(workers: usize, capacity: usize) -> TaskPoolConfig {
    TaskPoolConfig::new()
        .with_worker_count(workers)
        .with_max_task_count(capacity)
        .with_worker_wait_ms(20)
        .with_worker_stop_timeout_ms(1_000)
}

fn bump(counter: &Arc<AtomicU64>) {
    counter.fetch_add(1, Ordering::SeqCst);
}

// ============================================================================
// QUEUE MODE
// ============================================================================

#[test]
fn test_gated_items_converge_and_queue_is_bounded() {
    println!("\n=== test_gated_items_converge_and_queue_is_bounded ===");

    let pool = TaskPool::new(pool_config(3, 10)).unwrap();
    assert_eq!(pool.worker_count(), 3);
    println!("Pool created with 3 workers, capacity 10");

    // hold the workers so the queue fills deterministically
    pool.all_pause(true);
    thread::sleep(Duration::from_millis(200));

    let gate = Arc::new(Event::manual(false));
    let done = Arc::new(AtomicU64::new(0));
    for i in 0..10_u64 {
        let (gate, done) = (Arc::clone(&gate), Arc::clone(&done));
        pool.add_work(
            move |_: &u64| {
                gate.wait(Timeout::Infinite).unwrap();
                bump(&done);
            },
            i,
        )
        .unwrap();
    }
    assert_eq!(pool.len(), 10);
    assert_eq!(pool.pending(), 10);
    assert_eq!(pool.add_work(|_| {}, 10), Err(TaskError::NoSpace));
    println!("11th submission rejected: queue full");

    pool.all_pause(false);
    // each worker takes one item and blocks on the gate
    assert!(wait_until(Duration::from_secs(5), || {
        pool.len() == 7 && pool.pending() == 7
    }));
    assert_eq!(done.load(Ordering::SeqCst), 0);
    println!("3 items in flight, 7 resident");

    gate.set();
    assert!(wait_until(Duration::from_secs(5), || done.load(Ordering::SeqCst) == 10));
    assert!(pool.is_empty());
    assert_eq!(pool.pending(), 0);

    let stats = pool.stats();
    println!("Final stats: {stats:?}");
    assert_eq!(stats.submitted, 10);
    assert_eq!(stats.rejected, 1);
    assert!(wait_until(Duration::from_secs(5), || pool.stats().completed == 10));

    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_gated_items_converge_and_queue_is_bounded PASSED ===\n");
}

#[test]
fn test_callbacks_run_after_proc() {
    println!("\n=== test_callbacks_run_after_proc ===");

    let pool = TaskPool::new(pool_config(1, 8)).unwrap();
    let (tx, rx) = flume::unbounded();
    for i in 0..3_u32 {
        let (proc_tx, cb_tx) = (tx.clone(), tx.clone());
        pool.add_work_with_callback(
            move |n: &u32| proc_tx.send(format!("proc {n}")).unwrap(),
            i,
            move |n: &u32| cb_tx.send(format!("callback {n}")).unwrap(),
        )
        .unwrap();
    }

    let events: Vec<String> = (0..6)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    println!("Events: {events:?}");
    assert_eq!(
        events,
        vec!["proc 0", "callback 0", "proc 1", "callback 1", "proc 2", "callback 2"]
    );

    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_callbacks_run_after_proc PASSED ===\n");
}

#[test]
fn test_concurrent_submitters() {
    println!("\n=== test_concurrent_submitters ===");

    const SUBMITTERS: u64 = 4;
    const PER_SUBMITTER: u64 = 50;

    let pool = Arc::new(TaskPool::new(pool_config(4, 256)).unwrap());
    let done = Arc::new(AtomicU64::new(0));

    thread::scope(|s| {
        for _ in 0..SUBMITTERS {
            let (pool, done) = (Arc::clone(&pool), Arc::clone(&done));
            s.spawn(move || {
                let mut rng = rand::rng();
                for _ in 0..PER_SUBMITTER {
                    let done = Arc::clone(&done);
                    let work_us: u64 = rng.random_range(0..200);
                    pool.add_work(
                        move |us: &u64| {
                            thread::sleep(Duration::from_micros(*us));
                            bump(&done);
                        },
                        work_us,
                    )
                    .unwrap();
                }
            });
        }
    });

    let total = SUBMITTERS * PER_SUBMITTER;
    assert!(wait_until(Duration::from_secs(10), || done.load(Ordering::SeqCst) == total));
    let stats = pool.stats();
    println!("Final stats: {stats:?}");
    assert_eq!(stats.submitted, total);
    assert_eq!(stats.rejected, 0);

    let pool = Arc::into_inner(pool).unwrap();
    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_concurrent_submitters PASSED ===\n");
}

#[test]
fn test_remove_and_clear_keep_semaphore_in_step() {
    println!("\n=== test_remove_and_clear_keep_semaphore_in_step ===");

    let pool = TaskPool::new(pool_config(0, 16)).unwrap();
    for i in 0..6_u32 {
        pool.submit(WorkItem::new(|_: &u32| {}, i)).unwrap();
    }

    while pool.remove_if(|item| item.params() % 2 == 0).is_some() {}
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.pending(), pool.len());

    assert_eq!(pool.clear(), 3);
    assert_eq!(pool.pending(), 0);
    assert!(pool.remove_if(|_| true).is_none());

    pool.delete(Timeout::Poll).unwrap();
    println!("=== test_remove_and_clear_keep_semaphore_in_step PASSED ===\n");
}

// ============================================================================
// RESIZING
// ============================================================================

#[test]
fn test_reset_worker_count_sequence() {
    println!("\n=== test_reset_worker_count_sequence ===");

    let pool = TaskPool::<()>::new(pool_config(10, 4)).unwrap();
    assert_eq!(pool.worker_count(), 10);

    for target in [5, 8, 0] {
        pool.reset_worker_count(target).unwrap();
        assert_eq!(pool.worker_count(), target);
        assert_eq!(pool.stats().worker_count, target);
        println!("Resized to {target} workers");
    }

    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_reset_worker_count_sequence PASSED ===\n");
}

#[test]
fn test_workers_added_while_paused_stay_paused() {
    println!("\n=== test_workers_added_while_paused_stay_paused ===");

    let pool = TaskPool::new(pool_config(1, 8)).unwrap();
    pool.all_pause(true);
    // let the running worker reach its pause gate
    thread::sleep(Duration::from_millis(200));

    pool.reset_worker_count(3).unwrap();
    assert_eq!(pool.worker_count(), 3);

    let done = Arc::new(AtomicU64::new(0));
    for i in 0..5_u64 {
        let done = Arc::clone(&done);
        pool.add_work(move |_: &u64| bump(&done), i).unwrap();
    }
    thread::sleep(Duration::from_millis(200));
    assert_eq!(done.load(Ordering::SeqCst), 0);
    assert_eq!(pool.len(), 5);
    println!("New workers inherited the pool pause");

    pool.all_pause(false);
    assert!(wait_until(Duration::from_secs(5), || done.load(Ordering::SeqCst) == 5));
    assert!(pool.is_empty());

    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_workers_added_while_paused_stay_paused PASSED ===\n");
}

#[test]
fn test_shrink_abandons_stuck_worker() {
    println!("\n=== test_shrink_abandons_stuck_worker ===");

    let pool = TaskPool::new(pool_config(1, 4).with_worker_stop_timeout_ms(50)).unwrap();
    let gate = Arc::new(Event::manual(false));
    let (started_tx, started_rx) = flume::bounded(1);
    let (finished_tx, finished_rx) = flume::bounded(1);
    {
        let gate = Arc::clone(&gate);
        pool.add_work(
            move |_: &()| {
                started_tx.send(()).unwrap();
                gate.wait(Timeout::Infinite).unwrap();
                finished_tx.send(()).unwrap();
            },
            (),
        )
        .unwrap();
    }
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // the worker cannot finish within its grace period
    pool.reset_worker_count(0).unwrap();
    assert_eq!(pool.worker_count(), 0);
    println!("Stuck worker abandoned");

    gate.set();
    finished_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    println!("Abandoned worker finished its item");

    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_shrink_abandons_stuck_worker PASSED ===\n");
}

// ============================================================================
// CYCLING MODE
// ============================================================================

#[test]
fn test_cycling_pool_pause_and_resume() {
    println!("\n=== test_cycling_pool_pause_and_resume ===");

    let pool = TaskPool::new(pool_config(2, 8).with_cycling(true)).unwrap();
    assert!(pool.is_cycling());

    let runs = Arc::new(AtomicU64::new(0));
    for i in 0..5_usize {
        let runs = Arc::clone(&runs);
        pool.add_work(move |_: &usize| bump(&runs), i).unwrap();
    }
    assert_eq!(pool.pending(), 0);

    assert!(wait_until(Duration::from_secs(5), || runs.load(Ordering::SeqCst) > 20));
    assert_eq!(pool.len(), 5);
    println!("Items re-delivered: {}", runs.load(Ordering::SeqCst));

    pool.all_pause(true);
    thread::sleep(Duration::from_millis(50));
    let frozen = runs.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(runs.load(Ordering::SeqCst), frozen);
    println!("Frozen at {frozen}");

    pool.all_pause(false);
    assert!(wait_until(Duration::from_secs(5), || {
        runs.load(Ordering::SeqCst) > frozen + 20
    }));
    println!("Resumed to {}", runs.load(Ordering::SeqCst));

    assert!(pool.remove_if(|item| *item.params() == 0).is_some());
    assert_eq!(pool.len(), 4);
    assert_eq!(pool.clear(), 4);

    pool.delete(Timeout::Infinite).unwrap();
    println!("=== test_cycling_pool_pause_and_resume PASSED ===\n");
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_delete_drops_queued_items() {
    println!("\n=== test_delete_drops_queued_items ===");

    let pool = TaskPool::new(pool_config(2, 8)).unwrap();
    pool.all_pause(true);
    thread::sleep(Duration::from_millis(100));

    let runs = Arc::new(AtomicU64::new(0));
    for i in 0..5_u8 {
        let runs = Arc::clone(&runs);
        pool.add_work(move |_: &u8| bump(&runs), i).unwrap();
    }
    assert_eq!(pool.len(), 5);

    pool.delete(Timeout::After(Duration::from_secs(5))).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    println!("=== test_delete_drops_queued_items PASSED ===\n");
}
