//! Fixed-capacity, thread-safe object pool.
//!
//! A [`Pool<T, N>`] owns `N` default-constructed elements in place and hands
//! them out as [`PoolRef`] handles. Nothing is allocated after construction:
//! `acquire` is a first-fit scan over the occupancy flags and `release` is an
//! address-to-index computation followed by a flag write.
//!
//! ## Locking
//!
//! The occupancy record (flags, in-use count, high-water mark) lives behind a
//! `parking_lot::Mutex`. Every operation that touches it waits at most
//! [`Pool::lock_timeout`] (100 ms by default) and reports
//! [`PoolError::Contention`] instead of blocking the caller's control tick.
//! Slot contents are never touched under the lock.
//!
//! ## Handles
//!
//! A [`PoolRef`] borrows the pool, so it cannot outlive it, and it is not
//! `Clone`, so each occupied slot has exactly one live handle. Dropping a
//! handle without releasing it leaks the slot until [`Pool::reset`].
//!
//! ```rust
//! use kite_core::pool::Pool;
//!
//! let pool: Pool<u32, 3> = Pool::new();
//! let mut slot = pool.acquire().expect("free slot");
//! *slot = 42;
//! assert_eq!(pool.available(), 2);
//! assert!(pool.release(slot));
//! assert_eq!(pool.available(), 3);
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use kite_common::prelude::DEFAULT_POOL_LOCK_TIMEOUT;
use parking_lot::{Mutex, MutexGuard, const_mutex};
use thiserror::Error;

// ─── Errors ─────────────────────────────────────────────────────────

/// Pool operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every slot is handed out.
    #[error("pool exhausted: all {capacity} slots in use")]
    Exhausted {
        /// Pool capacity.
        capacity: usize,
    },

    /// The occupancy lock was not obtained within the bounded wait.
    #[error("pool lock not acquired within {waited:?}")]
    Contention {
        /// Bounded wait that expired.
        waited: Duration,
    },

    /// The address does not lie on a slot of this pool.
    #[error("address does not belong to this pool")]
    Foreign,

    /// The slot is not currently handed out.
    #[error("slot {index} is already free")]
    AlreadyFree {
        /// Slot index.
        index: usize,
    },
}

impl PoolError {
    /// Capacity and contention failures clear up on their own; retry next tick.
    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Contention { .. })
    }

    /// Foreign or double releases are caller bugs.
    #[inline]
    pub const fn is_handle_violation(&self) -> bool {
        matches!(self, Self::Foreign | Self::AlreadyFree { .. })
    }
}

/// A rejected release. Gives the handle back to the caller untouched.
#[derive(Error)]
#[error("release rejected: {kind}")]
pub struct ReleaseError<'p, T> {
    kind: PoolError,
    slot: PoolRef<'p, T>,
}

impl<'p, T> ReleaseError<'p, T> {
    /// Why the release was rejected.
    #[inline]
    pub fn kind(&self) -> PoolError {
        self.kind
    }

    /// Recover the handle.
    #[inline]
    pub fn into_inner(self) -> PoolRef<'p, T> {
        self.slot
    }
}

impl<T> fmt::Debug for ReleaseError<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseError")
            .field("kind", &self.kind)
            .field("slot", &self.slot.ptr)
            .finish()
    }
}

// ─── Slot observation ───────────────────────────────────────────────

/// Occupancy of the slot an address points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Not an address of this pool.
    Foreign,
    /// A slot of this pool, not handed out.
    Free,
    /// A slot of this pool, handed out.
    Occupied,
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Number of slots.
    pub capacity: usize,
    /// Slots currently handed out.
    pub in_use: usize,
    /// Largest `in_use` observed.
    pub high_water: usize,
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Acquisitions refused because every slot was in use.
    pub exhaustions: u64,
    /// Operations that gave up waiting for the lock.
    pub contentions: u64,
    /// Foreign or double releases.
    pub violations: u64,
}

// ─── Pool ───────────────────────────────────────────────────────────

struct Occupancy<const N: usize> {
    flags: [bool; N],
    in_use: usize,
    high_water: usize,
}

impl<const N: usize> Occupancy<N> {
    const fn new() -> Self {
        Self {
            flags: [false; N],
            in_use: 0,
            high_water: 0,
        }
    }
}

struct Counters {
    acquisitions: AtomicU64,
    exhaustions: AtomicU64,
    contentions: AtomicU64,
    violations: AtomicU64,
}

impl Counters {
    const fn new() -> Self {
        Self {
            acquisitions: AtomicU64::new(0),
            exhaustions: AtomicU64::new(0),
            contentions: AtomicU64::new(0),
            violations: AtomicU64::new(0),
        }
    }

    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Bounded reservoir of `N` pre-allocated `T`.
pub struct Pool<T, const N: usize> {
    slots: UnsafeCell<[T; N]>,
    occupancy: Mutex<Occupancy<N>>,
    lock_timeout: Duration,
    counters: Counters,
}

// SAFETY: slot contents are reachable only through a `PoolRef`, and the
// occupancy flags (written under the mutex) allow at most one `PoolRef`
// per slot. Handing a `PoolRef` to another thread hands over a `&mut T`,
// which requires `T: Send`.
unsafe impl<T: Send, const N: usize> Sync for Pool<T, N> {}

impl<T, const N: usize> Pool<T, N> {
    const STRIDE: usize = {
        assert!(
            core::mem::size_of::<T>() != 0,
            "pool elements must not be zero-sized"
        );
        core::mem::size_of::<T>()
    };

    /// Build a pool around caller-provided elements.
    ///
    /// `const`, so a pool can live in a `static`:
    ///
    /// ```rust
    /// use kite_core::pool::Pool;
    ///
    /// static BUFFERS: Pool<[u8; 64], 4> = Pool::from_array([[0; 64]; 4]);
    /// assert_eq!(BUFFERS.available(), 4);
    /// ```
    pub const fn from_array(items: [T; N]) -> Self {
        Self::from_array_with_timeout(items, DEFAULT_POOL_LOCK_TIMEOUT)
    }

    /// As [`Pool::from_array`] with an explicit bounded lock wait.
    pub const fn from_array_with_timeout(items: [T; N], lock_timeout: Duration) -> Self {
        let _stride = Self::STRIDE;
        Self {
            slots: UnsafeCell::new(items),
            occupancy: const_mutex(Occupancy::new()),
            lock_timeout,
            counters: Counters::new(),
        }
    }

    /// Number of slots.
    #[inline]
    pub const fn capacity() -> usize {
        N
    }

    /// Bounded wait applied to every lock acquisition.
    #[inline]
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Hand out the lowest-indexed free slot, or `None` when no slot could be
    /// handed out (exhausted or lock contention).
    #[inline]
    pub fn acquire(&self) -> Option<PoolRef<'_, T>> {
        self.try_acquire().ok()
    }

    /// Hand out the lowest-indexed free slot.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Exhausted`] if every slot is in use
    /// - [`PoolError::Contention`] if the lock wait expired
    ///
    /// Pool state is unchanged on error.
    pub fn try_acquire(&self) -> Result<PoolRef<'_, T>, PoolError> {
        let index = {
            let mut occupancy = self.lock()?;
            let Some(index) = occupancy.flags.iter().position(|used| !used) else {
                Counters::bump(&self.counters.exhaustions);
                return Err(PoolError::Exhausted { capacity: N });
            };
            occupancy.flags[index] = true;
            occupancy.in_use += 1;
            occupancy.high_water = occupancy.high_water.max(occupancy.in_use);
            index
        };
        Counters::bump(&self.counters.acquisitions);

        // SAFETY: `slot_ptr` offsets the non-null storage base by `index < N`.
        let ptr = unsafe { NonNull::new_unchecked(self.slot_ptr(index)) };
        Ok(PoolRef {
            ptr,
            _pool: PhantomData,
        })
    }

    /// Return a handle. `false` if it belongs to another pool; the rejected
    /// handle is dropped, which leaks its slot in the pool it came from.
    #[inline]
    pub fn release(&self, slot: PoolRef<'_, T>) -> bool {
        self.try_release(slot).is_ok()
    }

    /// Return a handle, giving it back on failure.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Foreign`] if the handle belongs to another pool
    /// - [`PoolError::Contention`] if the lock wait expired
    pub fn try_release<'p>(&self, slot: PoolRef<'p, T>) -> Result<(), ReleaseError<'p, T>> {
        match self.release_addr(slot.as_ptr()) {
            Ok(()) => Ok(()),
            Err(kind) => Err(ReleaseError { kind, slot }),
        }
    }

    /// Release the slot at `ptr` by address.
    ///
    /// Returns `false` without touching pool state for foreign addresses,
    /// misaligned addresses, free slots and lock timeouts.
    ///
    /// # Safety
    ///
    /// If the slot is occupied, its [`PoolRef`] must no longer be used
    /// (it has been forgotten or is being discarded). Otherwise a later
    /// `acquire` may hand out a second mutable handle to the same slot.
    pub unsafe fn release_ptr(&self, ptr: *const T) -> bool {
        self.release_addr(ptr).is_ok()
    }

    /// True iff `ptr` points at an occupied slot of this pool.
    ///
    /// Foreign addresses and lock timeouts yield `false`; use
    /// [`Pool::slot_state`] to tell them apart.
    #[inline]
    pub fn is_used(&self, ptr: *const T) -> bool {
        matches!(self.slot_state(ptr), Ok(SlotState::Occupied))
    }

    /// Three-valued occupancy of the slot at `ptr`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Contention`] if the lock wait expired.
    pub fn slot_state(&self, ptr: *const T) -> Result<SlotState, PoolError> {
        let Some(index) = self.index_of(ptr) else {
            return Ok(SlotState::Foreign);
        };
        let occupancy = self.lock()?;
        Ok(if occupancy.flags[index] {
            SlotState::Occupied
        } else {
            SlotState::Free
        })
    }

    /// Free slots. Reports `0` if the lock wait expired.
    #[inline]
    pub fn available(&self) -> usize {
        self.try_available().unwrap_or(0)
    }

    /// Free slots.
    ///
    /// # Errors
    ///
    /// [`PoolError::Contention`] if the lock wait expired.
    pub fn try_available(&self) -> Result<usize, PoolError> {
        Ok(N - self.lock()?.in_use)
    }

    /// Clear every occupancy flag.
    ///
    /// Exclusive access proves no [`PoolRef`] is alive, so only leaked slots
    /// can be reclaimed. Returns `true` if the pool was already idle and
    /// `false` if leaked slots were reclaimed, which means some caller
    /// dropped a handle without returning it.
    pub fn reset(&mut self) -> bool {
        let occupancy = self.occupancy.get_mut();
        let was_idle = occupancy.in_use == 0;
        occupancy.flags = [false; N];
        occupancy.in_use = 0;
        was_idle
    }

    /// Snapshot of occupancy and lifetime counters.
    ///
    /// # Errors
    ///
    /// [`PoolError::Contention`] if the lock wait expired.
    pub fn stats(&self) -> Result<PoolStats, PoolError> {
        let (in_use, high_water) = {
            let occupancy = self.lock()?;
            (occupancy.in_use, occupancy.high_water)
        };
        Ok(PoolStats {
            capacity: N,
            in_use,
            high_water,
            acquisitions: self.counters.acquisitions.load(Ordering::Relaxed),
            exhaustions: self.counters.exhaustions.load(Ordering::Relaxed),
            contentions: self.counters.contentions.load(Ordering::Relaxed),
            violations: self.counters.violations.load(Ordering::Relaxed),
        })
    }

    /// Take the occupancy lock and keep it until the guard drops. Every
    /// other pool operation meanwhile waits out its bounded lock timeout.
    #[cfg(any(test, feature = "testing"))]
    pub fn hold_lock(&self) -> LockHold<'_, N> {
        LockHold {
            _guard: self.occupancy.lock(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Occupancy<N>>, PoolError> {
        self.occupancy.try_lock_for(self.lock_timeout).ok_or_else(|| {
            Counters::bump(&self.counters.contentions);
            PoolError::Contention {
                waited: self.lock_timeout,
            }
        })
    }

    fn release_addr(&self, ptr: *const T) -> Result<(), PoolError> {
        let Some(index) = self.index_of(ptr) else {
            Counters::bump(&self.counters.violations);
            return Err(PoolError::Foreign);
        };
        let mut occupancy = self.lock()?;
        if !occupancy.flags[index] {
            Counters::bump(&self.counters.violations);
            return Err(PoolError::AlreadyFree { index });
        }
        occupancy.flags[index] = false;
        occupancy.in_use -= 1;
        Ok(())
    }

    #[inline]
    fn base(&self) -> *mut T {
        self.slots.get().cast::<T>()
    }

    #[inline]
    fn slot_ptr(&self, index: usize) -> *mut T {
        self.base().wrapping_add(index)
    }

    /// Slot index of `ptr`, or `None` unless it lies exactly on a slot.
    fn index_of(&self, ptr: *const T) -> Option<usize> {
        let offset = ptr.addr().checked_sub(self.base().addr())?;
        if offset % Self::STRIDE != 0 {
            return None;
        }
        let index = offset / Self::STRIDE;
        (index < N).then_some(index)
    }
}

/// Occupancy lock held by [`Pool::hold_lock`].
#[cfg(any(test, feature = "testing"))]
#[must_use = "the lock is released as soon as the hold is dropped"]
pub struct LockHold<'p, const N: usize> {
    _guard: MutexGuard<'p, Occupancy<N>>,
}

impl<T: Default, const N: usize> Pool<T, N> {
    /// Pool of `N` default-constructed elements with the default lock wait.
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_POOL_LOCK_TIMEOUT)
    }

    /// Pool of `N` default-constructed elements.
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self::from_array_with_timeout(core::array::from_fn(|_| T::default()), lock_timeout)
    }
}

impl<T: Default, const N: usize> Default for Pool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for Pool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &N)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl<T, const N: usize> Drop for Pool<T, N> {
    fn drop(&mut self) {
        let in_use = self.occupancy.get_mut().in_use;
        if !std::thread::panicking() {
            debug_assert!(in_use == 0, "pool dropped with {in_use} slot(s) still handed out");
        }
    }
}

// ─── Handle ─────────────────────────────────────────────────────────

/// Non-owning handle to one occupied pool slot.
///
/// Return it with [`Pool::release`]; dropping it leaks the slot.
#[must_use = "dropping a pool handle leaks its slot; return it with Pool::release"]
pub struct PoolRef<'p, T> {
    ptr: NonNull<T>,
    _pool: PhantomData<&'p mut T>,
}

// SAFETY: a `PoolRef` is an exclusive reference to its slot.
unsafe impl<T: Send> Send for PoolRef<'_, T> {}
// SAFETY: shared access to a `PoolRef` only yields `&T`.
unsafe impl<T: Sync> Sync for PoolRef<'_, T> {}

impl<T> PoolRef<'_, T> {
    /// Address of the slot.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<T> Deref for PoolRef<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the slot is occupied for as long as this handle exists,
        // so no other handle aliases it, and the pool outlives `'p`.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for PoolRef<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as in `deref`; `&mut self` makes the access exclusive.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PoolRef").field(&**self).finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
