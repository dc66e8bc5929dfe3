//! Top-level race analysis.
//!
//! Selects entry points, summarizes each one from a fresh root goroutine,
//! runs the race oracle per entry and turns races into diagnostics.

use std::collections::{BTreeMap, HashMap, HashSet};

use gorace_diagnostics::diagnostic::{Diagnostic, DiagnosticBuilder, Frequency, Severity};
use gorace_diagnostics::rules;
use gorace_ir::call_graph::CallGraph;
use gorace_ir::ir::{Function, Program};
use serde::Serialize;

use crate::access::GuardedAccess;
use crate::oracle::{self, Race, RaceKind, RaceOracle};
use crate::options::SummaryConfig;
use crate::summary::Summarizer;

/// Options of a race analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceOptions {
    pub summary: SummaryConfig,
    /// Short (or full) names of functions analyzed as entry points.
    pub entry_points: Vec<String>,
}

impl Default for RaceOptions {
    fn default() -> Self {
        Self {
            summary: SummaryConfig::default(),
            entry_points: vec!["main".into(), "init".into()],
        }
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RaceReport {
    /// Entry points analyzed, in program order.
    pub entries: Vec<String>,
    /// Accesses performed directly by each analyzed function.
    pub summaries: BTreeMap<String, Vec<GuardedAccess>>,
    /// Every access of every entry run.
    pub accesses: Vec<GuardedAccess>,
    pub races: Vec<Race>,
    pub diagnostics: Vec<Diagnostic>,
    /// Entries skipped because their summary failed.
    pub errors: Vec<String>,
}

/// Static data race detector.
///
/// Produces diagnostics for:
/// - RACE001: concurrent unsynchronized writes
/// - RACE002: concurrent unsynchronized read and write
pub struct RaceAnalyzer;

impl RaceAnalyzer {
    pub fn analyze(program: &Program) -> RaceReport {
        Self::analyze_with_options(program, &RaceOptions::default())
    }

    pub fn analyze_with_options(program: &Program, options: &RaceOptions) -> RaceReport {
        let mut report = RaceReport::default();
        let mut seen = HashSet::new();

        for entry in select_entries(program, options) {
            report.entries.push(entry.name.clone());

            let mut summarizer = Summarizer::new(program, &options.summary);
            let summary = match summarizer.summarize_entry(entry) {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(entry = %entry.name, error = %e, "race analysis failed, entry skipped");
                    report.errors.push(format!("{}: {e}", entry.name));
                    continue;
                }
            };

            let accesses = summary.accesses.into_vec();
            let races = RaceOracle::find_races(&accesses);
            tracing::debug!(
                entry = %entry.name,
                accesses = accesses.len(),
                races = races.len(),
                "entry analyzed"
            );

            for race in races {
                if seen.insert(race.key()) {
                    report.races.push(race);
                }
            }
            for (func, log) in summarizer.into_summaries() {
                report
                    .summaries
                    .entry(func)
                    .or_default()
                    .extend(log.into_vec());
            }
            report.accesses.extend(accesses);
        }

        oracle::sort_races(&mut report.races);
        report.diagnostics = report.races.iter().map(race_diagnostic).collect();
        report
    }
}

/// Functions to analyze as root goroutines.
///
/// In-scope functions matching a configured entry name; when none match,
/// every in-scope function without an in-scope caller.
pub fn select_entries<'p>(program: &'p Program, options: &RaceOptions) -> Vec<&'p Function> {
    let scope = &options.summary.scope;
    let in_scope: Vec<&Function> = program
        .functions()
        .filter(|f| f.has_body() && scope.contains(&f.package))
        .collect();

    let named: Vec<&Function> = in_scope
        .iter()
        .copied()
        .filter(|f| {
            options
                .entry_points
                .iter()
                .any(|e| *e == f.short_name || *e == f.name)
        })
        .collect();
    if !named.is_empty() {
        return named;
    }

    let graph = CallGraph::from_program(program);
    let packages: HashMap<&str, &str> = program
        .functions()
        .map(|f| (f.name.as_str(), f.package.as_str()))
        .collect();
    let roots: Vec<&Function> = in_scope
        .into_iter()
        .filter(|f| {
            !graph.has_callers_where(&f.name, |caller| {
                packages.get(caller).is_some_and(|pkg| scope.contains(pkg))
            })
        })
        .collect();
    tracing::debug!(
        count = roots.len(),
        "no configured entry point found, using call graph roots"
    );
    roots
}

fn race_diagnostic(race: &Race) -> Diagnostic {
    let (rule, severity, confidence) = match race.kind() {
        RaceKind::WriteWrite => (rules::WRITE_WRITE, Severity::Critical, 0.85),
        RaceKind::ReadWrite => (rules::READ_WRITE, Severity::Error, 0.8),
    };
    let later = &race.second;
    let earlier = &race.first;

    let (file, line, col) = later
        .position
        .as_ref()
        .map(|s| (s.file.as_str(), s.start_line, s.start_col))
        .unwrap_or(("unknown", 0, 1));
    let (cause_file, cause_line) = earlier
        .position
        .as_ref()
        .map(|s| (s.file.as_str(), s.start_line))
        .unwrap_or(("unknown", 0));

    let mut builder = DiagnosticBuilder::new(
        rule,
        severity,
        format!("Data race on '{}'", race.location().name()),
    )
    .location(file, line, col)
    .confidence(confidence)
    .explanation(format!(
        "{} of {} in {} on goroutine {} may run concurrently with the {} at {} in {} on goroutine {}, and no common lock is held",
        later.kind,
        race.location(),
        later.function,
        later.goroutine,
        earlier.kind,
        earlier.position_label(),
        earlier.function,
        earlier.goroutine,
    ))
    .root_cause(
        cause_file,
        cause_line,
        format!(
            "{} in {} on goroutine {}",
            earlier.kind, earlier.function, earlier.goroutine
        ),
    );
    if let Some(span) = later.position.as_ref().filter(|s| s.end_line > 0) {
        builder = builder.end_location(span.end_line, span.end_col);
    }
    if let Some(idiom) = rules::get_rule(rule).and_then(|r| r.go_idiom) {
        builder = builder.pattern("unsynchronized-shared-access", Frequency::VeryCommon, idiom);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gorace_ir::ir::*;

    fn make_span(line: u32) -> Option<Span> {
        Some(Span::new("main.go", line, 2))
    }

    fn func(name: &str, package: &str, instructions: Vec<Instruction>) -> Function {
        Function {
            name: name.into(),
            short_name: name.rsplit('.').next().unwrap_or(name).into(),
            package: package.into(),
            span: None,
            blocks: vec![BasicBlock {
                id: 0,
                comment: "entry".into(),
                instructions,
            }],
        }
    }

    fn call_edge(caller: &str, callee: &str) -> CallEdge {
        CallEdge {
            caller: caller.into(),
            callee: callee.into(),
        }
    }

    fn package(import_path: &str, functions: Vec<Function>, call_edges: Vec<CallEdge>) -> Package {
        Package {
            import_path: import_path.into(),
            name: import_path.rsplit('/').next().unwrap_or(import_path).into(),
            functions,
            call_edges,
        }
    }

    fn write_counter(line: u32) -> Instruction {
        Instruction {
            span: make_span(line),
            op: Op::Store {
                addr: Value::new(0, "counter").declared_at(Span::new("main.go", 3, 5)),
                val: Value::new(1, "t1"),
            },
        }
    }

    fn go_to(callee: &str, line: u32) -> Instruction {
        Instruction {
            span: make_span(line),
            op: Op::Go {
                call: CallCommon {
                    callee: Callee::Function {
                        name: callee.into(),
                    },
                    args: vec![],
                },
            },
        }
    }

    fn racy_program() -> Program {
        Program {
            packages: vec![package(
                "main",
                vec![
                    func("main.worker", "main", vec![write_counter(20)]),
                    func("main.main", "main", vec![go_to("main.worker", 10), write_counter(11)]),
                ],
                vec![call_edge("main.main", "main.worker")],
            )],
            go_version: "1.22".into(),
        }
    }

    #[test]
    fn test_analyzer_flags_unsynchronized_write() {
        let report = RaceAnalyzer::analyze(&racy_program());
        assert_eq!(report.entries, vec!["main.main".to_string()]);
        assert_eq!(report.races.len(), 1);
        assert!(report.errors.is_empty());

        let diag = &report.diagnostics[0];
        assert_eq!(diag.rule, "RACE001");
        assert_eq!(diag.severity, Severity::Critical);
        assert_eq!(diag.title, "Data race on 'counter'");
        // Location is the later access, root cause the earlier one.
        assert_eq!(diag.location.line, 20);
        assert_eq!(diag.root_cause.as_ref().map(|r| r.line), Some(11));
        assert!(diag.explanation.contains("main.worker"));
        assert!(diag.pattern.is_some());
    }

    #[test]
    fn test_report_keeps_per_function_accesses() {
        let report = RaceAnalyzer::analyze(&racy_program());
        assert_eq!(report.accesses.len(), 4);
        assert_eq!(report.summaries["main.worker"].len(), 2);
        assert_eq!(report.summaries["main.main"].len(), 2);
    }

    #[test]
    fn test_entry_points_by_short_name() {
        let program = Program {
            packages: vec![package(
                "main",
                vec![
                    func("main.init", "main", vec![]),
                    func("main.main", "main", vec![]),
                    func("main.helper", "main", vec![]),
                ],
                vec![],
            )],
            go_version: "1.22".into(),
        };
        let names: Vec<&str> = select_entries(&program, &RaceOptions::default())
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["main.init", "main.main"]);
    }

    #[test]
    fn test_entry_points_fall_back_to_roots() {
        let program = Program {
            packages: vec![
                package(
                    "pkg",
                    vec![
                        func("pkg.Serve", "pkg", vec![]),
                        func("pkg.handle", "pkg", vec![]),
                        func("pkg.Callback", "pkg", vec![]),
                    ],
                    vec![
                        call_edge("pkg.Serve", "pkg.handle"),
                        call_edge("net/http.run", "pkg.Callback"),
                    ],
                ),
                package("net/http", vec![func("net/http.run", "net/http", vec![])], vec![]),
            ],
            go_version: "1.22".into(),
        };
        let names: Vec<&str> = select_entries(&program, &RaceOptions::default())
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        // Callers outside the scope do not count.
        assert_eq!(names, vec!["pkg.Serve", "pkg.Callback"]);
    }

    #[test]
    fn test_failed_entry_is_skipped() {
        let dynamic = Instruction {
            span: make_span(5),
            op: Op::Call {
                call: CallCommon {
                    callee: Callee::Dynamic {
                        value: Value::new(4, "t4"),
                    },
                    args: vec![],
                },
            },
        };
        let mut program = racy_program();
        program.packages[0]
            .functions
            .push(func("main.init", "main", vec![dynamic]));

        let report = RaceAnalyzer::analyze(&program);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("main.init: "));
        assert_eq!(report.races.len(), 1, "other entries still report");
    }

    #[test]
    fn test_shared_callee_race_reported_once() {
        // Two entries reaching the same racy code produce the same pair.
        let mut program = racy_program();
        program.packages[0].functions.push(func(
            "main.init",
            "main",
            vec![go_to("main.worker", 10), write_counter(11)],
        ));
        let report = RaceAnalyzer::analyze(&program);
        assert_eq!(report.races.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_report_serializes() {
        let report = RaceAnalyzer::analyze(&racy_program());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["races"][0]["first"]["kind"], "write");
        assert_eq!(json["diagnostics"][0]["rule"], "RACE001");
    }
}
