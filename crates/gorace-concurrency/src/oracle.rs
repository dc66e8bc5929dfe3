//! Race oracle over a guarded-access log.
//!
//! Two accesses race when they touch the same location, at least one
//! writes, their locksets share no lock and their clocks are concurrent.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use gorace_ir::ir::Span;
use serde::Serialize;

use crate::access::{AccessKind, GuardedAccess};
use crate::identity::LocationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceKind {
    WriteWrite,
    ReadWrite,
}

/// A pair of conflicting accesses, `first` ordered before `second` by
/// source position.
#[derive(Debug, Clone, Serialize)]
pub struct Race {
    pub first: GuardedAccess,
    pub second: GuardedAccess,
}

/// Unordered pair of (position, kind) on one location.
pub(crate) type RaceKey = (LocationId, Option<Span>, AccessKind, Option<Span>, AccessKind);

impl Race {
    fn ordered(a: &GuardedAccess, b: &GuardedAccess) -> Self {
        let (first, second) = if (&a.position, a.kind) <= (&b.position, b.kind) {
            (a, b)
        } else {
            (b, a)
        };
        Self {
            first: first.clone(),
            second: second.clone(),
        }
    }

    pub fn location(&self) -> &LocationId {
        &self.first.location
    }

    pub fn kind(&self) -> RaceKind {
        if self.first.is_write() && self.second.is_write() {
            RaceKind::WriteWrite
        } else {
            RaceKind::ReadWrite
        }
    }

    pub(crate) fn key(&self) -> RaceKey {
        (
            self.first.location.clone(),
            self.first.position.clone(),
            self.first.kind,
            self.second.position.clone(),
            self.second.kind,
        )
    }

    fn cmp_position(&self, other: &Race) -> Ordering {
        (&self.first.position, &self.second.position, self.first.kind, self.second.kind).cmp(&(
            &other.first.position,
            &other.second.position,
            other.first.kind,
            other.second.kind,
        ))
    }
}

pub struct RaceOracle;

impl RaceOracle {
    /// Whether `a` and `b` form a data race.
    pub fn conflicts(a: &GuardedAccess, b: &GuardedAccess) -> bool {
        a.location == b.location
            && (a.is_write() || b.is_write())
            && a.lockset.is_disjoint(&b.lockset)
            && a.clock.is_concurrent_with(&b.clock)
    }

    /// All racing pairs in `accesses`, deduplicated and sorted by position.
    pub fn find_races(accesses: &[GuardedAccess]) -> Vec<Race> {
        let mut by_location: BTreeMap<&LocationId, Vec<&GuardedAccess>> = BTreeMap::new();
        for access in accesses {
            by_location.entry(&access.location).or_default().push(access);
        }

        let mut seen = HashSet::new();
        let mut races = Vec::new();
        for group in by_location.values() {
            if !group.iter().any(|a| a.is_write()) {
                continue;
            }
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if !Self::conflicts(a, b) {
                        continue;
                    }
                    let race = Race::ordered(a, b);
                    if seen.insert(race.key()) {
                        races.push(race);
                    }
                }
            }
        }

        sort_races(&mut races);
        races
    }
}

pub(crate) fn sort_races(races: &mut [Race]) {
    races.sort_by(Race::cmp_position);
}
