//! Property tests: the pool against a simple occupancy model.

use kite_core::pool::{Pool, PoolRef};
use proptest::prelude::*;

const CAPACITY: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Acquire,
    /// Release the n-th outstanding handle (modulo the number held).
    Release(usize),
    /// Release an address that was already released.
    ReleaseStale,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Acquire),
        3 => any::<usize>().prop_map(Op::Release),
        1 => Just(Op::ReleaseStale),
    ]
}

fn check_invariants(
    pool: &Pool<u32, CAPACITY>,
    held: &[PoolRef<'_, u32>],
) -> Result<(), TestCaseError> {
    prop_assert_eq!(pool.available() + held.len(), CAPACITY);
    for (i, a) in held.iter().enumerate() {
        prop_assert!(pool.is_used(a.as_ptr()));
        for b in &held[i + 1..] {
            prop_assert_ne!(a.as_ptr(), b.as_ptr());
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_occupancy_matches_outstanding_handles(ops in prop::collection::vec(arb_op(), 1..64)) {
        let pool: Pool<u32, CAPACITY> = Pool::new();
        let mut held: Vec<PoolRef<'_, u32>> = Vec::new();
        let mut stale: Option<*const u32> = None;

        for op in ops {
            match op {
                Op::Acquire => match pool.acquire() {
                    Some(slot) => held.push(slot),
                    None => prop_assert_eq!(held.len(), CAPACITY),
                },
                Op::Release(n) if !held.is_empty() => {
                    let slot = held.swap_remove(n % held.len());
                    let addr = slot.as_ptr();
                    prop_assert!(pool.release(slot));
                    prop_assert!(!pool.is_used(addr));
                    stale = Some(addr);
                }
                Op::Release(_) => {}
                Op::ReleaseStale => {
                    if let Some(addr) = stale {
                        let reacquired = held.iter().any(|h| h.as_ptr() == addr);
                        if !reacquired {
                            let before = pool.available();
                            // SAFETY: the slot is free; the release is refused.
                            let released = unsafe { pool.release_ptr(addr) };
                            prop_assert!(!released);
                            prop_assert_eq!(pool.available(), before);
                        }
                    }
                }
            }
            check_invariants(&pool, &held)?;
        }

        for slot in held.drain(..) {
            prop_assert!(pool.release(slot));
        }
        prop_assert_eq!(pool.available(), CAPACITY);
    }

    #[test]
    fn prop_first_fit_returns_lowest_free_index(release_mask in 1u8..(1 << CAPACITY)) {
        let pool: Pool<u32, CAPACITY> = Pool::new();
        let mut slots: Vec<Option<PoolRef<'_, u32>>> =
            (0..CAPACITY).map(|_| pool.acquire()).collect();
        let addrs: Vec<*const u32> = slots
            .iter()
            .map(|s| s.as_ref().map(|r| r.as_ptr()).unwrap_or(std::ptr::null()))
            .collect();

        for (i, slot) in slots.iter_mut().enumerate() {
            if release_mask & (1 << i) != 0 {
                prop_assert!(pool.release(slot.take().unwrap()));
            }
        }

        let lowest = release_mask.trailing_zeros() as usize;
        let next = pool.acquire().unwrap();
        prop_assert_eq!(next.as_ptr(), addrs[lowest]);

        prop_assert!(pool.release(next));
        for slot in slots.into_iter().flatten() {
            prop_assert!(pool.release(slot));
        }
    }
}
