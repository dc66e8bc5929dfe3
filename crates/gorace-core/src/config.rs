//! Configuration loading from gorace.toml.

use gorace_concurrency::analysis::RaceOptions;
use gorace_concurrency::options::{
    AnalysisScope, LockSignatures, SummaryConfig, DEFAULT_MAX_DEPTH,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "gorace.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gorace: GoraceConfig,
    pub scope: ScopeConfig,
    pub locks: LocksConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoraceConfig {
    pub severity_threshold: String,
    pub max_diagnostics: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Import paths analyzed interprocedurally. `prefix/...` matches a subtree.
    pub packages: Vec<String>,
    /// Short names of functions analyzed as root goroutines.
    pub entry_points: Vec<String>,
    pub max_depth: usize,
}

/// Callee names (as emitted by the bridge) that acquire or release the
/// lock passed as their receiver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocksConfig {
    pub acquire: Vec<String>,
    pub release: Vec<String>,
}

impl Default for GoraceConfig {
    fn default() -> Self {
        Self {
            severity_threshold: "warning".to_string(),
            max_diagnostics: 100,
        }
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            packages: vec!["main".to_string(), "pkg".to_string()],
            entry_points: vec!["main".to_string(), "init".to_string()],
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            acquire: vec![
                "(*sync.Mutex).Lock".to_string(),
                "(*sync.RWMutex).Lock".to_string(),
                "(*sync.RWMutex).RLock".to_string(),
            ],
            release: vec![
                "(*sync.Mutex).Unlock".to_string(),
                "(*sync.RWMutex).Unlock".to_string(),
                "(*sync.RWMutex).RUnlock".to_string(),
            ],
        }
    }
}

impl Config {
    /// Engine options described by this configuration.
    pub fn race_options(&self) -> RaceOptions {
        RaceOptions {
            summary: SummaryConfig {
                scope: AnalysisScope::new(self.scope.packages.iter().cloned()),
                locks: LockSignatures::new(
                    self.locks.acquire.iter().cloned(),
                    self.locks.release.iter().cloned(),
                ),
                max_depth: self.scope.max_depth,
            },
            entry_points: self.scope.entry_points.clone(),
        }
    }
}

/// Find and load gorace.toml, walking up from `start_dir`.
/// Returns default config if no file is found or it cannot be parsed.
pub fn load_config(start_dir: &Path) -> Config {
    let Some(path) = find_config_file(start_dir) else {
        return Config::default();
    };
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read config, using defaults");
            return Config::default();
        }
    };
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Config::default()
        }
    }
}

/// Walk up directories looking for gorace.toml.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Default TOML content for `gorace init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"[gorace]
severity_threshold = "warning"
max_diagnostics = 100

[scope]
# Packages analyzed interprocedurally; calls into anything else are opaque.
# "example.com/app/..." matches the package and everything below it.
packages = ["main", "pkg"]
entry_points = ["main", "init"]
max_depth = 64

[locks]
acquire = ["(*sync.Mutex).Lock", "(*sync.RWMutex).Lock", "(*sync.RWMutex).RLock"]
release = ["(*sync.Mutex).Unlock", "(*sync.RWMutex).Unlock", "(*sync.RWMutex).RUnlock"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.gorace.severity_threshold, "warning");
        assert_eq!(cfg.gorace.max_diagnostics, 100);
        assert_eq!(cfg.scope.packages, vec!["main", "pkg"]);
        assert_eq!(cfg.scope.max_depth, 64);
        assert_eq!(cfg.locks.acquire.len(), 3);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[gorace]
severity_threshold = "error"

[scope]
packages = ["example.com/app/..."]
entry_points = ["Serve"]
max_depth = 8

[locks]
acquire = ["(*example.com/app/sync.SpinLock).Lock"]
release = ["(*example.com/app/sync.SpinLock).Unlock"]
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.gorace.severity_threshold, "error");
        assert_eq!(cfg.gorace.max_diagnostics, 100);
        assert_eq!(cfg.scope.entry_points, vec!["Serve"]);

        let options = cfg.race_options();
        assert!(options.summary.scope.contains("example.com/app/store"));
        assert!(!options.summary.scope.contains("main"));
        assert!(options
            .summary
            .locks
            .is_acquire("(*example.com/app/sync.SpinLock).Lock"));
        assert!(!options.summary.locks.is_acquire("(*sync.Mutex).Lock"));
        assert_eq!(options.summary.max_depth, 8);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[scope]
packages = ["main"]
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.scope.packages, vec!["main"]);
        assert_eq!(cfg.scope.entry_points, vec!["main", "init"]);
        assert_eq!(cfg.scope.max_depth, 64);
        assert_eq!(cfg.gorace.severity_threshold, "warning");
        assert_eq!(cfg.locks.release.len(), 3);
    }

    #[test]
    fn test_default_options_match_engine_defaults() {
        assert_eq!(Config::default().race_options(), RaceOptions::default());
    }

    #[test]
    fn test_load_config_no_file() {
        let cfg = load_config(Path::new("/nonexistent/path"));
        assert_eq!(cfg.gorace.severity_threshold, "warning");
    }

    #[test]
    fn test_load_config_invalid_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[scope\npackages = 3").unwrap();
        let cfg = load_config(dir.path());
        assert_eq!(cfg.scope.packages, vec!["main", "pkg"]);
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[gorace]\nmax_diagnostics = 5\n",
        )
        .unwrap();
        let cfg = load_config(dir.path());
        assert_eq!(cfg.gorace.max_diagnostics, 5);
    }

    #[test]
    fn test_find_config_file_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), DEFAULT_CONFIG_TOML).unwrap();
        let found = find_config_file(dir.path());
        assert_eq!(found, Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), DEFAULT_CONFIG_TOML).unwrap();
        let subdir = dir.path().join("sub").join("deeper");
        std::fs::create_dir_all(&subdir).unwrap();
        let found = find_config_file(&subdir);
        assert_eq!(found, Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_default_config_toml_parses() {
        let cfg: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(cfg.gorace.severity_threshold, "warning");
        assert_eq!(cfg.scope.entry_points, vec!["main", "init"]);
        assert_eq!(cfg.locks.acquire, LocksConfig::default().acquire);
    }
}
