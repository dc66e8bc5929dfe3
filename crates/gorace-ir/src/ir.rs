//! High-level IR wrappers for Go SSA.
//!
//! These types mirror the JSON document produced by the Go bridge. The race
//! engine only ever reads them: functions, their basic blocks, and the
//! instructions and operand values inside each block.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root type: the whole program as emitted by the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub packages: Vec<Package>,
    #[serde(default)]
    pub go_version: String,
}

/// A Go package with its SSA functions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub import_path: String,
    pub name: String,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub call_edges: Vec<CallEdge>,
}

/// Source location span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_col: u32,
}

impl Span {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}

/// An SSA value used as an instruction operand.
///
/// `name` is the source name when the value denotes a source variable
/// (alloc, global, free variable, parameter) and the register name (`t3`)
/// otherwise. `decl` is only set for source variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Value {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub decl: Option<Span>,
    /// Full name of the function that declares this value.
    #[serde(default)]
    pub parent: Option<String>,
}

impl Value {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            decl: None,
            parent: None,
        }
    }

    pub fn declared_at(mut self, span: Span) -> Self {
        self.decl = Some(span);
        self
    }

    pub fn in_function(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// What a call instruction invokes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Callee {
    /// Static call of a named function or method, e.g. `(*sync.Mutex).Lock`.
    Function { name: String },
    /// Call of a closure created by `MakeClosure`.
    Closure { function: String },
    /// Call of a Go builtin (`len`, `append`, `delete`, ...).
    Builtin { name: String },
    /// Interface method invocation or call through a function value.
    Dynamic { value: Value },
}

/// The common part of Call, Go and Defer instructions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallCommon {
    pub callee: Callee,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallCommon {
    /// Name of the called function, closure body or builtin.
    pub fn callee_name(&self) -> Option<&str> {
        match &self.callee {
            Callee::Function { name } | Callee::Builtin { name } => Some(name),
            Callee::Closure { function } => Some(function),
            Callee::Dynamic { .. } => None,
        }
    }

    /// The receiver of a method call (first argument).
    pub fn receiver(&self) -> Option<&Value> {
        self.args.first()
    }
}

/// SSA instruction kinds the race engine distinguishes.
///
/// Anything else the bridge emits (Alloc, Phi, Jump, Return, Send, ...)
/// deserializes to `Unhandled`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum Op {
    UnOp { x: Value },
    Field { x: Value },
    FieldAddr { x: Value },
    Index { x: Value },
    IndexAddr { x: Value },
    Lookup { x: Value },
    Panic { x: Value },
    Range { x: Value },
    TypeAssert { x: Value },
    If { cond: Value },
    BinOp {
        x: Value,
        y: Value,
        #[serde(default)]
        op: String,
    },
    MapUpdate { map: Value, value: Value },
    Store { addr: Value, val: Value },
    Call { call: CallCommon },
    Go { call: CallCommon },
    Defer { call: CallCommon },
    #[serde(other)]
    Unhandled,
}

/// SSA instruction with its source position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instruction {
    #[serde(default)]
    pub span: Option<Span>,
    pub op: Op,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Self { span: None, op }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// SSA basic block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: u32,
    /// go/ssa block comment (`entry`, `if.then`, `if.else`, `select.body`, ...).
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

/// SSA function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Fully qualified name, e.g. `main.main$1` or `(*pkg.Cache).Put`.
    pub name: String,
    pub short_name: String,
    /// Import path of the declaring package.
    pub package: String,
    #[serde(default)]
    pub span: Option<Span>,
    /// Empty for external functions (declared but not built by the bridge).
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }
}

/// Static call graph edge (plain calls, `go` and `defer` alike)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.packages.iter().flat_map(|p| p.functions.iter())
    }

    /// Index every function of every package by its full name.
    pub fn function_map(&self) -> HashMap<&str, &Function> {
        self.functions().map(|f| (f.name.as_str(), f)).collect()
    }
}
