//! Guarded memory accesses: what was touched, how, and under which
//! locks and logical time.

use std::fmt;

use gorace_ir::ir::{Span, Value};
use serde::Serialize;

use crate::clock::{GoroutineId, VectorClock};
use crate::goroutine::GoroutineState;
use crate::identity::LocationId;
use crate::lockset::LocksetSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// One memory access with the goroutine context it happened in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardedAccess {
    pub position: Option<Span>,
    pub location: LocationId,
    pub kind: AccessKind,
    pub lockset: LocksetSnapshot,
    pub clock: VectorClock,
    pub goroutine: GoroutineId,
    /// Function whose instruction performed the access.
    pub function: String,
}

impl GuardedAccess {
    pub fn new(
        position: Option<&Span>,
        value: &Value,
        kind: AccessKind,
        state: &GoroutineState,
        function: &str,
    ) -> Self {
        Self {
            position: position.cloned(),
            location: LocationId::of(value),
            kind,
            lockset: state.lockset().snapshot(),
            clock: state.clock().clone(),
            goroutine: state.goroutine(),
            function: function.to_string(),
        }
    }

    pub fn is_write(&self) -> bool {
        self.kind == AccessKind::Write
    }

    /// `file:line:col` of the access, or `<unknown>`.
    pub fn position_label(&self) -> String {
        self.position
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

/// Append-only log of guarded accesses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccessLog(Vec<GuardedAccess>);

impl AccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one access against the current state and return it.
    pub fn record(
        &mut self,
        position: Option<&Span>,
        value: &Value,
        kind: AccessKind,
        state: &GoroutineState,
        function: &str,
    ) -> &GuardedAccess {
        let index = self.0.len();
        self.0
            .push(GuardedAccess::new(position, value, kind, state, function));
        &self.0[index]
    }

    pub fn push(&mut self, access: GuardedAccess) {
        self.0.push(access);
    }

    pub fn extend(&mut self, other: AccessLog) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GuardedAccess> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[GuardedAccess] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<GuardedAccess> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AccessLog {
    type Item = &'a GuardedAccess;
    type IntoIter = std::slice::Iter<'a, GuardedAccess>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
