//! Call graph helpers for inter-procedural analysis.
//!
//! Indexes the call edges emitted by the Go bridge. The race analyzer uses
//! it to pick entry points: functions nobody in scope calls.

use crate::ir::{CallEdge, Program};
use std::collections::HashMap;

/// Call edges of a whole program, indexed by callee
pub struct CallGraph {
    callees: HashMap<String, Vec<CallEdge>>,
}

impl CallGraph {
    /// Build a call graph index from every package's call edges
    pub fn from_program(program: &Program) -> Self {
        let mut callees: HashMap<String, Vec<CallEdge>> = HashMap::new();
        for edge in program.packages.iter().flat_map(|p| p.call_edges.iter()) {
            callees
                .entry(edge.callee.clone())
                .or_default()
                .push(edge.clone());
        }
        Self { callees }
    }

    /// Get all call edges where `func_name` is the callee
    pub fn calls_to(&self, func_name: &str) -> &[CallEdge] {
        self.callees
            .get(func_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Check if any caller accepted by `filter` calls `func_name`.
    /// Self-recursive edges do not count.
    pub fn has_callers_where(&self, func_name: &str, filter: impl Fn(&str) -> bool) -> bool {
        self.calls_to(func_name)
            .iter()
            .any(|edge| edge.caller != func_name && filter(&edge.caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;

    fn edge(caller: &str, callee: &str) -> CallEdge {
        CallEdge {
            caller: caller.into(),
            callee: callee.into(),
        }
    }

    fn make_test_program() -> Program {
        Program {
            packages: vec![Package {
                import_path: "main".into(),
                name: "main".into(),
                functions: vec![],
                call_edges: vec![
                    edge("main.main", "main.main$1"),
                    edge("main.main", "main.update"),
                    edge("main.update", "(*sync.Mutex).Lock"),
                    edge("main.worker", "main.update"),
                    edge("main.fib", "main.fib"),
                ],
            }],
            go_version: String::new(),
        }
    }

    #[test]
    fn test_calls_to() {
        let cg = CallGraph::from_program(&make_test_program());

        let to_update = cg.calls_to("main.update");
        assert_eq!(to_update.len(), 2);
        assert_eq!(to_update[0].caller, "main.main");
        assert_eq!(to_update[1].caller, "main.worker");
        assert!(cg.calls_to("main.main").is_empty());
    }

    #[test]
    fn test_has_callers_where_ignores_self_recursion() {
        let cg = CallGraph::from_program(&make_test_program());

        assert_eq!(cg.calls_to("main.fib").len(), 1);
        assert!(!cg.has_callers_where("main.fib", |_| true));
        assert!(cg.has_callers_where("main.update", |c| c.starts_with("main.")));
        assert!(!cg.has_callers_where("main.update", |c| c.starts_with("lib.")));
    }

    #[test]
    fn test_empty_call_graph() {
        let cg = CallGraph::from_program(&Program::default());
        assert!(cg.calls_to("main.main").is_empty());
        assert!(!cg.has_callers_where("main.main", |_| true));
    }
}
