//! Vector clocks over statically allocated goroutine ids.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Static goroutine identity. `ROOT` is the goroutine an entry point runs on;
/// every analyzed `go` statement allocates a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GoroutineId(pub u32);

impl GoroutineId {
    pub const ROOT: GoroutineId = GoroutineId(0);
}

impl fmt::Display for GoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Map from goroutine id to logical time. Missing components are zero and
/// never stored, so structural equality is clock equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VectorClock(BTreeMap<GoroutineId, u64>);

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, goroutine: GoroutineId) -> u64 {
        self.0.get(&goroutine).copied().unwrap_or(0)
    }

    /// Advance the component of `goroutine` by one.
    pub fn tick(&mut self, goroutine: GoroutineId) {
        *self.0.entry(goroutine).or_insert(0) += 1;
    }

    /// Pointwise maximum.
    pub fn join(&mut self, other: &VectorClock) {
        for (&goroutine, &time) in &other.0 {
            let slot = self.0.entry(goroutine).or_insert(0);
            *slot = (*slot).max(time);
        }
    }

    /// `self <= other` componentwise.
    pub fn happens_before_or_equal(&self, other: &VectorClock) -> bool {
        self.0.iter().all(|(&g, &time)| time <= other.get(g))
    }

    /// Strictly ordered before `other`.
    pub fn happens_before(&self, other: &VectorClock) -> bool {
        self != other && self.happens_before_or_equal(other)
    }

    /// Neither clock is ordered before the other.
    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        !self.happens_before_or_equal(other) && !other.happens_before_or_equal(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GoroutineId, u64)> + '_ {
        self.0.iter().map(|(&g, &t)| (g, t))
    }
}

impl PartialOrd for VectorClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (
            self.happens_before_or_equal(other),
            other.happens_before_or_equal(self),
        ) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (g, t)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{g}:{t}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(components: &[(u32, u64)]) -> VectorClock {
        let mut c = VectorClock::new();
        for &(g, t) in components {
            for _ in 0..t {
                c.tick(GoroutineId(g));
            }
        }
        c
    }

    #[test]
    fn test_missing_components_are_zero() {
        let c = clock(&[(0, 2)]);
        assert_eq!(c.get(GoroutineId::ROOT), 2);
        assert_eq!(c.get(GoroutineId(5)), 0);
        assert!(VectorClock::new().happens_before_or_equal(&c));
    }

    #[test]
    fn test_ordered_clocks() {
        let a = clock(&[(0, 1)]);
        let b = clock(&[(0, 2), (1, 1)]);
        assert!(a.happens_before(&b));
        assert!(!b.happens_before(&a));
        assert!(!a.is_concurrent_with(&b));
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_equal_clocks_are_not_concurrent() {
        let a = clock(&[(0, 1), (1, 1)]);
        let b = clock(&[(1, 1), (0, 1)]);
        assert_eq!(a, b);
        assert!(!a.is_concurrent_with(&b));
        assert!(!a.happens_before(&b));
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal));
    }

    #[test]
    fn test_spawner_and_child_are_concurrent() {
        // Spawner at {g0:1} spawns g1: child {g0:1, g1:1}, spawner ticks to {g0:2}.
        let child = clock(&[(0, 1), (1, 1)]);
        let spawner = clock(&[(0, 2)]);
        assert!(child.is_concurrent_with(&spawner));
        assert!(spawner.is_concurrent_with(&child));
        assert_eq!(child.partial_cmp(&spawner), None);
    }

    #[test]
    fn test_join_is_pointwise_max() {
        let mut a = clock(&[(0, 3), (1, 1)]);
        let b = clock(&[(0, 1), (2, 4)]);
        a.join(&b);
        assert_eq!(a, clock(&[(0, 3), (1, 1), (2, 4)]));
        assert!(b.happens_before_or_equal(&a));
    }

    #[test]
    fn test_display() {
        assert_eq!(clock(&[(0, 2), (1, 1)]).to_string(), "[g0:2, g1:1]");
        assert_eq!(VectorClock::new().to_string(), "[]");
    }
}
