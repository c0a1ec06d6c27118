//! Finite-state-machine base.
//!
//! [`FsmCore`] holds what every control-loop state machine needs: the current
//! state tag, the time it was entered, and a timeout. Concrete machines embed
//! a core and implement [`StateMachine::update`]; the owning task calls
//! `update` once per tick.
//!
//! The core does no locking. One task owns the machine and drives both
//! `update` and `transition_to`.
//!
//! ```rust
//! use kite_core::clock::ManualClock;
//! use kite_core::fsm::{FsmCore, StateMachine};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Reel { Idle, Paying }
//!
//! struct Winch { core: FsmCore<Reel, ManualClock> }
//!
//! impl StateMachine for Winch {
//!     type State = Reel;
//!     type Clock = ManualClock;
//!     fn core(&self) -> &FsmCore<Reel, ManualClock> { &self.core }
//!     fn core_mut(&mut self) -> &mut FsmCore<Reel, ManualClock> { &mut self.core }
//!     fn update(&mut self) {
//!         if self.current_state() == Reel::Paying && self.has_timed_out() {
//!             self.transition_to(Reel::Idle);
//!         }
//!     }
//! }
//!
//! let clock = ManualClock::new(0);
//! let mut winch = Winch { core: FsmCore::new(Reel::Paying, 100, clock.clone()) };
//! clock.advance(100);
//! winch.update();
//! assert_eq!(winch.current_state(), Reel::Idle);
//! ```

use core::fmt::Debug;

use crate::clock::{Clock, elapsed_ms};

/// State tag, entry timestamp, timeout and clock of one state machine.
#[derive(Debug, Clone)]
pub struct FsmCore<S, C> {
    state: S,
    entered_at_ms: u32,
    timeout_ms: u32,
    clock: C,
}

impl<S, C> FsmCore<S, C>
where
    S: Copy + Eq + Debug,
    C: Clock,
{
    /// Start in `initial`, entered now.
    pub fn new(initial: S, timeout_ms: u32, clock: C) -> Self {
        let entered_at_ms = clock.now_ms();
        Self {
            state: initial,
            entered_at_ms,
            timeout_ms,
            clock,
        }
    }

    #[inline]
    pub fn current_state(&self) -> S {
        self.state
    }

    /// Enter `next` and restart the state timer.
    ///
    /// Self-transitions are allowed and also restart the timer.
    pub fn transition_to(&mut self, next: S) {
        self.state = next;
        self.entered_at_ms = self.clock.now_ms();
    }

    /// True once the current state has lasted at least the timeout.
    #[inline]
    pub fn has_timed_out(&self) -> bool {
        self.elapsed_ms() >= self.timeout_ms
    }

    /// Time spent in the current state.
    #[inline]
    pub fn elapsed_ms(&self) -> u32 {
        elapsed_ms(self.clock.now_ms(), self.entered_at_ms)
    }

    #[inline]
    pub fn entered_at_ms(&self) -> u32 {
        self.entered_at_ms
    }

    #[inline]
    pub fn timeout(&self) -> u32 {
        self.timeout_ms
    }

    /// Change the timeout. The state timer keeps running.
    #[inline]
    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// A concrete state machine driven by periodic ticks.
pub trait StateMachine {
    /// State tag, usually a fieldless `#[repr(u8)]` enum.
    type State: Copy + Eq + Debug;
    /// Time source of the embedded core.
    type Clock: Clock;

    fn core(&self) -> &FsmCore<Self::State, Self::Clock>;

    fn core_mut(&mut self) -> &mut FsmCore<Self::State, Self::Clock>;

    /// One control tick.
    fn update(&mut self);

    #[inline]
    fn current_state(&self) -> Self::State {
        self.core().current_state()
    }

    #[inline]
    fn transition_to(&mut self, next: Self::State) {
        self.core_mut().transition_to(next);
    }

    #[inline]
    fn has_timed_out(&self) -> bool {
        self.core().has_timed_out()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
