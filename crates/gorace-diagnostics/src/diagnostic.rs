//! Core diagnostic types for gorace.
//!
//! The race oracle produces `Diagnostic` values, and the formatters
//! (human, JSON) consume them.

use serde::{Deserialize, Serialize};

/// A diagnostic produced by the race analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Unique ID: RULE_CODE-file:line (e.g., "RACE001-main.go:21").
    pub id: String,
    /// Rule code (e.g., "RACE001").
    pub rule: String,
    /// Severity level.
    pub severity: Severity,
    /// Analysis confidence (0.0 to 1.0).
    pub confidence: f64,
    /// One-line summary.
    pub title: String,
    /// Detailed explanation of why the two accesses conflict.
    pub explanation: String,
    /// The later of the two conflicting accesses.
    pub location: Location,
    /// The other access of the racing pair.
    pub root_cause: Option<RootCause>,
    /// IDs of related diagnostics.
    pub related: Vec<String>,
    /// Pattern information.
    pub pattern: Option<Pattern>,
}

/// Severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding.
    Info,
    /// Potential issue that should be addressed.
    Warning,
    /// Definite bug or serious issue.
    Error,
    /// Critical safety issue (write/write data race).
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl Severity {
    /// Check if this severity is at or above a threshold.
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        *self >= threshold
    }
}

/// Source code location.
///
/// Lines and columns are 1-based (matching Go's `token.Position`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    /// Line number (1-based).
    pub line: u32,
    /// Column offset (1-based).
    pub column: u32,
    /// End line number (1-based).
    pub end_line: u32,
    /// End column offset (1-based).
    pub end_column: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Root cause information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCause {
    pub file: String,
    pub line: u32,
    pub description: String,
}

/// Pattern information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Name of the pattern.
    pub name: String,
    /// How frequently this pattern occurs.
    pub frequency: Frequency,
    /// The correct Go idiom to use instead.
    pub go_idiom: String,
}

/// How common a pattern is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    VeryCommon,
    Common,
    Uncommon,
    Rare,
}

/// Builder for creating diagnostics conveniently.
pub struct DiagnosticBuilder {
    rule: String,
    severity: Severity,
    title: String,
    file: String,
    line: u32,
    column: u32,
    end_line: u32,
    end_column: u32,
    confidence: f64,
    explanation: String,
    root_cause: Option<RootCause>,
    related: Vec<String>,
    pattern: Option<Pattern>,
}

impl DiagnosticBuilder {
    /// Create a new diagnostic builder.
    pub fn new(rule: impl Into<String>, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity,
            title: title.into(),
            file: String::new(),
            line: 0,
            column: 0,
            end_line: 0,
            end_column: 0,
            confidence: 0.9,
            explanation: String::new(),
            root_cause: None,
            related: Vec::new(),
            pattern: None,
        }
    }

    /// Set the location.
    pub fn location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self.column = column;
        self.end_line = line;
        self.end_column = column;
        self
    }

    /// Set the end location.
    pub fn end_location(mut self, end_line: u32, end_column: u32) -> Self {
        self.end_line = end_line;
        self.end_column = end_column;
        self
    }

    /// Set the confidence level.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the explanation.
    pub fn explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Set the root cause.
    pub fn root_cause(
        mut self,
        file: impl Into<String>,
        line: u32,
        description: impl Into<String>,
    ) -> Self {
        self.root_cause = Some(RootCause {
            file: file.into(),
            line,
            description: description.into(),
        });
        self
    }

    /// Add a related diagnostic ID.
    pub fn related(mut self, id: impl Into<String>) -> Self {
        self.related.push(id.into());
        self
    }

    /// Set the pattern.
    pub fn pattern(
        mut self,
        name: impl Into<String>,
        frequency: Frequency,
        go_idiom: impl Into<String>,
    ) -> Self {
        self.pattern = Some(Pattern {
            name: name.into(),
            frequency,
            go_idiom: go_idiom.into(),
        });
        self
    }

    /// Build the diagnostic.
    pub fn build(self) -> Diagnostic {
        let id = format!("{}-{}:{}", self.rule, self.file, self.line);
        Diagnostic {
            id,
            rule: self.rule,
            severity: self.severity,
            confidence: self.confidence,
            title: self.title,
            explanation: self.explanation,
            location: Location {
                file: self.file,
                line: self.line,
                column: self.column,
                end_line: self.end_line,
                end_column: self.end_column,
            },
            root_cause: self.root_cause,
            related: self.related,
            pattern: self.pattern,
        }
    }
}
