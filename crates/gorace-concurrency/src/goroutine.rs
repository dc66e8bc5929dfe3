//! Abstract state of one goroutine along an analysis path.

use crate::clock::{GoroutineId, VectorClock};
use crate::identity::LockId;
use crate::lockset::Lockset;

/// Goroutine identity, logical clock and held locks.
///
/// Every summarizer works on its own `copy()` and hands the result back
/// through `merge_states`, so summaries never alias their caller's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoroutineState {
    goroutine: GoroutineId,
    clock: VectorClock,
    lockset: Lockset,
}

impl GoroutineState {
    /// Fresh state for `goroutine` with its own clock component at 1.
    pub fn new(goroutine: GoroutineId) -> Self {
        let mut clock = VectorClock::new();
        clock.tick(goroutine);
        Self {
            goroutine,
            clock,
            lockset: Lockset::new(),
        }
    }

    pub fn goroutine(&self) -> GoroutineId {
        self.goroutine
    }

    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    pub fn lockset(&self) -> &Lockset {
        &self.lockset
    }

    pub fn acquire(&mut self, lock: LockId) {
        self.lockset.acquire(lock);
    }

    pub fn release(&mut self, lock: &LockId) {
        self.lockset.release(lock);
    }

    /// Independent copy; the lockset delta starts empty.
    pub fn copy(&self) -> Self {
        Self {
            goroutine: self.goroutine,
            clock: self.clock.clone(),
            lockset: self.lockset.fork(),
        }
    }

    /// Advance this goroutine's own clock component.
    pub fn increment(&mut self) {
        self.clock.tick(self.goroutine);
    }

    /// State of a goroutine started from here: the current clock and locks,
    /// plus its own component. Call before `increment()` on the spawner.
    pub fn spawn(&self, child: GoroutineId) -> Self {
        let mut clock = self.clock.clone();
        clock.tick(child);
        Self {
            goroutine: child,
            clock,
            lockset: self.lockset.fork(),
        }
    }

    /// Fold the state a sub-summary ended in back into `self`.
    ///
    /// The lockset follows `Lockset::join`. The clock is taken from `other`
    /// when the sub-summary always runs, and joined pointwise otherwise.
    pub fn merge_states(&mut self, other: GoroutineState, conditional: bool) {
        self.lockset = self.lockset.join(&other.lockset, conditional);
        if conditional {
            self.clock.join(&other.clock);
        } else {
            self.clock = other.clock;
        }
    }
}
