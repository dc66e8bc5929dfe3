//! Analysis orchestrator: loads IR, runs the race engine, shapes output.

use crate::config::Config;
use gorace_concurrency::analysis::RaceAnalyzer;
use gorace_diagnostics::diagnostic::{Diagnostic, Severity};
use gorace_ir::ir::Program;
use gorace_ir::LoadError;
use std::path::Path;

/// Complete output from an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub diagnostics: Vec<Diagnostic>,
    pub summary: AnalysisSummary,
    /// Entry points whose analysis failed, with the reason.
    pub analysis_errors: Vec<String>,
}

/// Summary statistics for the analysis.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisSummary {
    pub total: usize,
    pub critical: usize,
    pub error: usize,
    pub packages_analyzed: usize,
    pub functions_analyzed: usize,
    pub entry_points: usize,
    pub accesses_recorded: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("cannot load IR: {0}")]
    Load(#[from] LoadError),
}

/// Load a bridge JSON file and analyze it.
pub fn analyze_file(path: &Path, config: &Config) -> Result<AnalysisOutput, OrchestratorError> {
    let program = gorace_ir::load_program_file(path)?;
    Ok(analyze_ir(&program, config))
}

/// Run the race analysis on already-loaded IR.
/// Used by the CLI (after loading) and tests (from fixtures).
pub fn analyze_ir(program: &Program, config: &Config) -> AnalysisOutput {
    let report = RaceAnalyzer::analyze_with_options(program, &config.race_options());

    tracing::info!(
        entries = report.entries.len(),
        accesses = report.accesses.len(),
        races = report.races.len(),
        "race analysis finished"
    );

    let mut output = postprocess_diagnostics(report.diagnostics, config, program);
    output.summary.entry_points = report.entries.len();
    output.summary.accesses_recorded = report.accesses.len();
    output.analysis_errors = report.errors;
    output
}

/// Shared post-processing: severity filter, sort, truncate, build summary.
fn postprocess_diagnostics(
    mut diags: Vec<Diagnostic>,
    config: &Config,
    program: &Program,
) -> AnalysisOutput {
    let threshold = parse_severity(&config.gorace.severity_threshold);
    diags.retain(|d| d.severity.is_at_least(threshold));

    diags.sort_by(|a, b| {
        a.location
            .file
            .cmp(&b.location.file)
            .then(a.location.line.cmp(&b.location.line))
            .then(b.severity.cmp(&a.severity))
    });

    if config.gorace.max_diagnostics > 0 && diags.len() > config.gorace.max_diagnostics {
        diags.truncate(config.gorace.max_diagnostics);
    }

    let summary = AnalysisSummary {
        total: diags.len(),
        critical: diags
            .iter()
            .filter(|d| d.severity == Severity::Critical)
            .count(),
        error: diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count(),
        packages_analyzed: program.packages.len(),
        functions_analyzed: program.packages.iter().map(|p| p.functions.len()).sum(),
        entry_points: 0,
        accesses_recorded: 0,
    };

    AnalysisOutput {
        diagnostics: diags,
        summary,
        analysis_errors: Vec::new(),
    }
}

pub fn parse_severity(s: &str) -> Severity {
    match s {
        "critical" => Severity::Critical,
        "error" => Severity::Error,
        "warning" => Severity::Warning,
        "info" => Severity::Info,
        _ => Severity::Warning,
    }
}
