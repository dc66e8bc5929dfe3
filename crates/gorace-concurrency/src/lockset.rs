//! Lockset lattice for the race engine.
//!
//! A `Lockset` holds the locks acquired on the current analysis path. Besides
//! the held set it keeps the net delta since it was forked, which is what an
//! unconditional join replays onto the parent.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::identity::LockId;

/// Locks held on one analysis path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lockset {
    held: HashSet<LockId>,
    /// Acquired since the fork and not released again.
    acquired: HashSet<LockId>,
    /// Released since the fork and not acquired again.
    released: HashSet<LockId>,
}

impl Lockset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, id: LockId) {
        self.released.remove(&id);
        self.acquired.insert(id.clone());
        self.held.insert(id);
    }

    pub fn release(&mut self, id: &LockId) {
        self.acquired.remove(id);
        self.released.insert(id.clone());
        self.held.remove(id);
    }

    pub fn contains(&self, id: &LockId) -> bool {
        self.held.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Independent copy holding the same locks, with an empty delta.
    pub fn fork(&self) -> Lockset {
        Lockset {
            held: self.held.clone(),
            acquired: HashSet::new(),
            released: HashSet::new(),
        }
    }

    /// Join a child lockset (forked from `self`) back into `self`.
    ///
    /// Unconditional: the child's acquires and releases are replayed.
    /// Conditional: the child's effects are dropped, only locks held on
    /// every path survive.
    pub fn join(&self, child: &Lockset, conditional: bool) -> Lockset {
        let mut joined = self.clone();
        if conditional {
            return joined;
        }
        for id in &child.acquired {
            joined.acquire(id.clone());
        }
        for id in &child.released {
            joined.release(id);
        }
        joined
    }

    /// Immutable, ordered copy of the held locks.
    pub fn snapshot(&self) -> LocksetSnapshot {
        LocksetSnapshot(self.held.iter().cloned().collect())
    }
}

/// Locks held at the moment an access was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocksetSnapshot(BTreeSet<LockId>);

impl LocksetSnapshot {
    pub fn contains(&self, id: &LockId) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No lock in common (Eraser-style violation when both access one location).
    pub fn is_disjoint(&self, other: &LocksetSnapshot) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockId> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gorace_ir::ir::{Span, Value};

    fn lock(name: &str, line: u32) -> LockId {
        LockId::of(&Value::new(0, name).declared_at(Span::new("main.go", line, 5)))
    }

    #[test]
    fn test_acquire_release() {
        let mu = lock("mu", 5);
        let mut set = Lockset::new();
        set.acquire(mu.clone());
        assert!(set.contains(&mu));
        assert_eq!(set.len(), 1);
        set.release(&mu);
        assert!(set.is_empty());
    }

    #[test]
    fn test_conditional_join_keeps_parent() {
        let (a, b) = (lock("a", 1), lock("b", 2));
        let mut parent = Lockset::new();
        parent.acquire(a.clone());

        let mut child = parent.fork();
        child.release(&a);
        child.acquire(b.clone());

        let joined = parent.join(&child, true);
        assert_eq!(joined.snapshot(), parent.snapshot());
        assert!(joined.contains(&a));
        assert!(!joined.contains(&b));
    }

    #[test]
    fn test_unconditional_join_replays_child() {
        let (a, b, c) = (lock("a", 1), lock("b", 2), lock("c", 3));
        let mut parent = Lockset::new();
        parent.acquire(a.clone());
        parent.acquire(c.clone());

        let mut child = parent.fork();
        child.release(&a);
        child.acquire(b.clone());

        let joined = parent.join(&child, false);
        assert!(!joined.contains(&a), "child release must be applied");
        assert!(joined.contains(&b), "child acquire must be applied");
        assert!(joined.contains(&c), "untouched locks survive");
    }

    #[test]
    fn test_acquire_then_release_in_child_is_net_noop() {
        let mu = lock("mu", 5);
        let parent = Lockset::new();
        let mut child = parent.fork();
        child.acquire(mu.clone());
        child.release(&mu);

        let joined = parent.join(&child, false);
        assert!(joined.is_empty());
    }

    #[test]
    fn test_replayed_delta_propagates_upward() {
        let mu = lock("mu", 5);
        let grandparent = Lockset::new();
        let parent = grandparent.fork();
        let mut child = parent.fork();
        child.acquire(mu.clone());

        let parent = parent.join(&child, false);
        let grandparent = grandparent.join(&parent, false);
        assert!(grandparent.contains(&mu));
    }

    #[test]
    fn test_fork_is_independent() {
        let mu = lock("mu", 5);
        let original = Lockset::new();
        let mut copy = original.fork();
        copy.acquire(mu.clone());
        assert!(!original.contains(&mu));
    }

    #[test]
    fn test_snapshot_disjointness() {
        let (a, b) = (lock("a", 1), lock("b", 2));
        let mut x = Lockset::new();
        x.acquire(a.clone());
        let mut y = Lockset::new();
        y.acquire(b.clone());
        assert!(x.snapshot().is_disjoint(&y.snapshot()));

        y.acquire(a);
        assert!(!x.snapshot().is_disjoint(&y.snapshot()));
        assert!(Lockset::new().snapshot().is_disjoint(&Lockset::new().snapshot()));
    }
}
