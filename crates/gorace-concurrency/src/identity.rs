//! Identity of memory locations and locks.
//!
//! Two program points touch "the same" location when their operand values
//! map to the same `LocationId`. Source variables are keyed by name plus
//! declaration site, so a variable captured by a closure (a free variable
//! with the same declaration) is recognized as the variable itself. SSA
//! registers carry no declaration and are scoped by their function.

use std::fmt;

use gorace_ir::ir::{Span, Value};
use serde::Serialize;

const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Declaration site of a source variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclSite {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl From<&Span> for DeclSite {
    fn from(span: &Span) -> Self {
        Self {
            file: span.file.clone(),
            line: span.start_line,
            col: span.start_col,
        }
    }
}

impl fmt::Display for DeclSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Identity of an accessed memory location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationId {
    /// A source variable (global, local, parameter, captured variable).
    Declared { name: String, site: DeclSite },
    /// An SSA register, only meaningful inside its function.
    Register { function: String, name: String },
}

impl LocationId {
    pub fn of(value: &Value) -> Self {
        match &value.decl {
            Some(span) => Self::Declared {
                name: value.name.clone(),
                site: DeclSite::from(span),
            },
            None => Self::Register {
                function: value
                    .parent
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()),
                name: value.name.clone(),
            },
        }
    }

    /// Source or register name of the location.
    pub fn name(&self) -> &str {
        match self {
            Self::Declared { name, .. } | Self::Register { name, .. } => name,
        }
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared { name, site } => write!(f, "{name} (declared at {site})"),
            Self::Register { function, name } => write!(f, "{name} in {function}"),
        }
    }
}

/// Identity of a lock instance: the location of the mutex receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LockId(LocationId);

impl LockId {
    pub fn of(receiver: &Value) -> Self {
        Self(LocationId::of(receiver))
    }

    pub fn location(&self) -> &LocationId {
        &self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(id: u32, name: &str, line: u32) -> Value {
        Value::new(id, name).declared_at(Span::new("main.go", line, 6))
    }

    #[test]
    fn test_same_variable_through_closure_capture() {
        // The Alloc in main and the FreeVar in main$1 are different SSA
        // values but share name and declaration.
        let alloc = declared(0, "a", 15).in_function("main.main");
        let free_var = declared(7, "a", 15).in_function("main.main$1");
        assert_eq!(LocationId::of(&alloc), LocationId::of(&free_var));
    }

    #[test]
    fn test_shadowed_variables_differ() {
        let outer = declared(0, "err", 10);
        let inner = declared(1, "err", 14);
        assert_ne!(LocationId::of(&outer), LocationId::of(&inner));
    }

    #[test]
    fn test_registers_scoped_by_function() {
        let a = Value::new(0, "t0").in_function("main.main");
        let b = Value::new(0, "t0").in_function("main.worker");
        assert_ne!(LocationId::of(&a), LocationId::of(&b));
        assert_eq!(
            LocationId::of(&a),
            LocationId::of(&Value::new(3, "t0").in_function("main.main"))
        );
    }

    #[test]
    fn test_register_without_parent() {
        let id = LocationId::of(&Value::new(2, "t2"));
        assert_eq!(
            id,
            LocationId::Register {
                function: "<unknown>".into(),
                name: "t2".into()
            }
        );
        assert_eq!(id.to_string(), "t2 in <unknown>");
    }

    #[test]
    fn test_lock_identity() {
        let mu = declared(0, "mu", 5);
        let other = declared(1, "mu2", 6);
        assert_eq!(LockId::of(&mu), LockId::of(&declared(9, "mu", 5)));
        assert_ne!(LockId::of(&mu), LockId::of(&other));
        assert_eq!(LockId::of(&mu).location().name(), "mu");
        assert_eq!(LockId::of(&mu).to_string(), "mu (declared at main.go:5:6)");
    }
}
