//! Rule catalog: every race rule gorace can report.
//!
//! Single source of truth for rule metadata; `gorace explain` and
//! `gorace rules` read from here, and the analyzer takes titles, severities
//! and idioms from the same entries.

use serde::Serialize;

use crate::diagnostic::Severity;

/// Write/write race between two goroutines.
pub const WRITE_WRITE: &str = "RACE001";
/// Read/write race between two goroutines.
pub const READ_WRITE: &str = "RACE002";

/// Information about a single analysis rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub code: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    /// Example Go code that triggers this rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_bad: Option<String>,
    /// Example Go code that is safe (does not trigger this rule).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_good: Option<String>,
    /// Go idiom or best practice for avoiding this issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub go_idiom: Option<String>,
}

/// Look up a single rule by code (e.g., "RACE001").
pub fn get_rule(code: &str) -> Option<RuleInfo> {
    get_all_rules().into_iter().find(|r| r.code == code)
}

/// Return all available analysis rules.
pub fn get_all_rules() -> Vec<RuleInfo> {
    vec![
        RuleInfo {
            code: WRITE_WRITE.into(),
            name: "Concurrent unsynchronized writes".into(),
            description: "Two goroutines that may run concurrently write the same location and \
                          no lock is held on both paths."
                .into(),
            severity: Severity::Critical,
            category: "concurrency".into(),
            example_bad: Some(
                "var a Writer\ngo func() { a = DummyWriter{1} }()\na = DummyWriter{2} // races with the goroutine"
                    .into(),
            ),
            example_good: Some(
                "var mu sync.Mutex\ngo func() { mu.Lock(); a = DummyWriter{1}; mu.Unlock() }()\nmu.Lock()\na = DummyWriter{2}\nmu.Unlock()"
                    .into(),
            ),
            go_idiom: Some(
                "Guard shared variables with the same sync.Mutex on every access, or hand ownership over a channel"
                    .into(),
            ),
        },
        RuleInfo {
            code: READ_WRITE.into(),
            name: "Concurrent unsynchronized read and write".into(),
            description: "A location is read by one goroutine while another goroutine that may \
                          run concurrently writes it, with no common lock held."
                .into(),
            severity: Severity::Error,
            category: "concurrency".into(),
            example_bad: Some(
                "go func() { total += n }()\nfmt.Println(total) // unsynchronized read".into(),
            ),
            example_good: Some(
                "go func() { mu.Lock(); total += n; mu.Unlock() }()\nmu.Lock()\nfmt.Println(total)\nmu.Unlock()"
                    .into(),
            ),
            go_idiom: Some(
                "Reads of shared state need the lock too; use sync.RWMutex.RLock for read-heavy paths"
                    .into(),
            ),
        },
    ]
}
