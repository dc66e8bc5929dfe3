//! Knobs of the summary engine: analysis scope, lock signatures, limits.

use std::collections::HashSet;

/// Default recursion depth cap for the function summarizer.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Package allow-list. Entries are exact import paths, or prefixes ending
/// in `/...` that match the prefix and everything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisScope {
    packages: Vec<String>,
}

impl AnalysisScope {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, import_path: &str) -> bool {
        self.packages
            .iter()
            .any(|pattern| match pattern.strip_suffix("/...") {
                Some(prefix) => {
                    import_path == prefix
                        || import_path
                            .strip_prefix(prefix)
                            .is_some_and(|rest| rest.starts_with('/'))
                }
                None => pattern == import_path,
            })
    }

    pub fn patterns(&self) -> &[String] {
        &self.packages
    }
}

impl Default for AnalysisScope {
    fn default() -> Self {
        Self::new(["main", "pkg"])
    }
}

/// Callee names that acquire or release the lock passed as receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSignatures {
    acquire: HashSet<String>,
    release: HashSet<String>,
}

impl LockSignatures {
    pub fn new<I, S>(acquire: I, release: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            acquire: acquire.into_iter().map(Into::into).collect(),
            release: release.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_acquire(&self, callee: &str) -> bool {
        self.acquire.contains(callee)
    }

    pub fn is_release(&self, callee: &str) -> bool {
        self.release.contains(callee)
    }
}

impl Default for LockSignatures {
    fn default() -> Self {
        Self::new(
            vec![
                "(*sync.Mutex).Lock",
                "(*sync.RWMutex).Lock",
                "(*sync.RWMutex).RLock",
            ],
            vec![
                "(*sync.Mutex).Unlock",
                "(*sync.RWMutex).Unlock",
                "(*sync.RWMutex).RUnlock",
            ],
        )
    }
}

/// Everything the summarizer needs besides the program itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    pub scope: AnalysisScope,
    pub locks: LockSignatures,
    pub max_depth: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            scope: AnalysisScope::default(),
            locks: LockSignatures::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
