//! Object pool behavior across threads and at the storage boundaries.

use std::sync::Barrier;
use std::time::Duration;

use kite_core::pool::{Pool, PoolError, SlotState};

#[test]
fn test_exhaustion_then_reuse_of_released_slot() {
    let pool: Pool<i32, 3> = Pool::new();

    let a = pool.acquire().expect("slot 0");
    let b = pool.acquire().expect("slot 1");
    let c = pool.acquire().expect("slot 2");
    assert!(pool.acquire().is_none());
    assert_eq!(pool.available(), 0);

    let freed = b.as_ptr();
    assert!(pool.release(b));
    assert_eq!(pool.available(), 1);

    let d = pool.acquire().expect("reused slot");
    assert_eq!(d.as_ptr(), freed);

    for slot in [a, c, d] {
        assert!(pool.release(slot));
    }
    assert_eq!(pool.available(), 3);
}

#[test]
fn test_foreign_and_out_of_range_addresses() {
    let pool: Pool<i32, 3> = Pool::new();
    let x = 0i32;
    let first = pool.acquire().unwrap();

    for addr in [
        &x as *const i32,
        first.as_ptr().wrapping_sub(1),
        first.as_ptr().wrapping_add(3),
    ] {
        assert!(!pool.is_used(addr));
        assert_eq!(pool.slot_state(addr), Ok(SlotState::Foreign));
        // SAFETY: none of these addresses is a slot; nothing is freed.
        assert!(!unsafe { pool.release_ptr(addr) });
    }
    assert_eq!(pool.available(), 2);

    assert_eq!(pool.slot_state(first.as_ptr()), Ok(SlotState::Occupied));
    let addr = first.as_ptr();
    assert!(pool.release(first));
    assert_eq!(pool.slot_state(addr), Ok(SlotState::Free));
}

#[test]
fn test_two_threads_race_for_last_slot() {
    let pool: Pool<u64, 2> = Pool::new();
    let held = pool.acquire().unwrap();
    let attempted = Barrier::new(2);
    let start = Barrier::new(2);

    let winners: usize = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    start.wait();
                    let slot = pool.acquire();
                    let won = slot.is_some();
                    // Hold the slot until both threads have tried.
                    attempted.wait();
                    if let Some(slot) = slot {
                        assert!(pool.release(slot));
                    }
                    usize::from(won)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(winners, 1);
    assert!(pool.release(held));
    assert_eq!(pool.available(), 2);
}

#[test]
fn test_concurrent_handles_never_alias() {
    const THREADS: u64 = 8;
    const ROUNDS: u64 = 500;
    let pool: Pool<u64, 4> = Pool::new();

    std::thread::scope(|s| {
        for id in 0..THREADS {
            let pool = &pool;
            s.spawn(move || {
                for round in 0..ROUNDS {
                    let Some(mut slot) = pool.acquire() else {
                        std::thread::yield_now();
                        continue;
                    };
                    let stamp = (id << 32) | round;
                    *slot = stamp;
                    std::thread::yield_now();
                    assert_eq!(*slot, stamp, "another thread wrote into our slot");
                    assert!(pool.release(slot));
                }
            });
        }
    });

    let stats = pool.stats().unwrap();
    assert_eq!(stats.in_use, 0);
    assert!(stats.high_water <= 4);
    assert_eq!(stats.violations, 0);
    assert_eq!(pool.available(), 4);
}

#[test]
fn test_handles_move_between_threads() {
    let pool: Pool<[u8; 16], 2> = Pool::new();
    let mut slot = pool.acquire().unwrap();
    slot[0] = 0xA5;

    let slot = std::thread::scope(|s| {
        s.spawn(move || {
            assert_eq!(slot[0], 0xA5);
            slot
        })
        .join()
        .unwrap()
    });

    assert!(pool.release(slot));
}

#[test]
fn test_lock_timeout_is_configurable() {
    let pool: Pool<u8, 1> = Pool::with_lock_timeout(Duration::from_millis(20));
    assert_eq!(pool.lock_timeout(), Duration::from_millis(20));

    let err = PoolError::Contention {
        waited: pool.lock_timeout(),
    };
    assert_eq!(err.to_string(), "pool lock not acquired within 20ms");
}

#[test]
fn test_static_pool() {
    static SCRATCH: Pool<[u8; 32], 2> = Pool::from_array([[0; 32]; 2]);

    let a = SCRATCH.acquire().unwrap();
    let b = SCRATCH.acquire().unwrap();
    assert!(SCRATCH.acquire().is_none());
    assert!(SCRATCH.release(a));
    assert!(SCRATCH.release(b));
    assert_eq!(SCRATCH.available(), 2);
}
