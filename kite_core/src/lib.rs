//! # Kite Core
//!
//! Allocation-free primitives shared by the Kite PiloteV3 control tasks.
//!
//! ## Modules
//!
//! - [`pool`] - fixed-capacity, thread-safe object pool with move-only handles
//! - [`fsm`] - state machine base: state tag, entry time, timeout predicate
//! - [`clock`] - 32-bit wrapping millisecond clocks (host and manual)
//!
//! None of these modules log. Callers decide how a failed acquire or release
//! is reported.

pub mod clock;
pub mod fsm;
pub mod pool;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use fsm::{FsmCore, StateMachine};
pub use pool::{Pool, PoolError, PoolRef, PoolStats, ReleaseError, SlotState};
