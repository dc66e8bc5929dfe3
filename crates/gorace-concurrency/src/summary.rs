//! Block and function summarizers.
//!
//! A summary is the list of guarded accesses a block or call performs plus
//! the goroutine state it ends in. Calls are summarized on a copy of the
//! caller's state and merged back unconditionally; `go` targets run on a
//! freshly spawned state that is never merged back; deferred calls are
//! queued and unwound LIFO when the function body ends.
//!
//! Summaries are recomputed for every call site and state, there is no
//! memoization. Termination relies on the scope filter, a call-stack
//! recursion guard and the depth cap.

use std::collections::{BTreeMap, HashMap};

use gorace_ir::ir::{BasicBlock, CallCommon, Callee, Function, Op, Program, Span, Value};

use crate::access::{AccessKind, AccessLog, GuardedAccess};
use crate::builtin::{BuiltinModel, GoBuiltins};
use crate::clock::GoroutineId;
use crate::goroutine::GoroutineState;
use crate::identity::LockId;
use crate::options::SummaryConfig;

/// Block comments whose blocks only run on some paths.
pub const CONDITIONAL_BLOCKS: &[&str] = &["if.then", "if.else", "select.body"];

/// Function name used for accesses recorded outside any function body.
const NO_FUNCTION: &str = "<root>";

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("{position}: call through `{value}` in {function} has no static callee")]
    UnresolvedCallee {
        function: String,
        value: String,
        position: String,
    },
}

/// A deferred call and whether the defer statement only runs on some paths.
#[derive(Debug, Clone, Copy)]
pub struct ConditionalFunction<'p> {
    pub call: &'p CallCommon,
    pub site: Option<&'p Span>,
    pub is_conditional: bool,
}

/// Result of summarizing one basic block.
#[derive(Debug, Clone)]
pub struct BlockSummary<'p> {
    /// Defer statements of the block, in source order.
    pub deferred: Vec<ConditionalFunction<'p>>,
    pub accesses: AccessLog,
    pub state: GoroutineState,
}

/// Result of summarizing one call under one state.
#[derive(Debug, Clone)]
pub struct FunctionSummary {
    /// The analyzed function; `None` for lock operations, builtins and
    /// calls left opaque.
    pub function: Option<String>,
    pub accesses: AccessLog,
    pub state: GoroutineState,
}

impl FunctionSummary {
    fn opaque(state: GoroutineState) -> Self {
        Self {
            function: None,
            accesses: AccessLog::new(),
            state,
        }
    }
}

pub fn is_conditional_block(block: &BasicBlock) -> bool {
    CONDITIONAL_BLOCKS.contains(&block.comment.as_str())
}

/// Summarizer for one analysis run.
pub struct Summarizer<'p> {
    functions: HashMap<&'p str, &'p Function>,
    config: &'p SummaryConfig,
    builtins: &'p dyn BuiltinModel,
    /// Functions currently being summarized, innermost last.
    stack: Vec<&'p str>,
    next_goroutine: u32,
    per_function: BTreeMap<String, AccessLog>,
}

impl<'p> Summarizer<'p> {
    pub fn new(program: &'p Program, config: &'p SummaryConfig) -> Self {
        Self {
            functions: program.function_map(),
            config,
            builtins: &GoBuiltins,
            stack: Vec::new(),
            next_goroutine: 0,
            per_function: BTreeMap::new(),
        }
    }

    pub fn with_builtins(mut self, builtins: &'p dyn BuiltinModel) -> Self {
        self.builtins = builtins;
        self
    }

    /// Accesses performed directly by each analyzed function, across every
    /// call site and state it was summarized under.
    pub fn summaries(&self) -> &BTreeMap<String, AccessLog> {
        &self.per_function
    }

    pub fn into_summaries(self) -> BTreeMap<String, AccessLog> {
        self.per_function
    }

    /// Summarize `entry` as the body of the root goroutine.
    ///
    /// Goroutine ids restart at the root for every entry.
    pub fn summarize_entry(&mut self, entry: &'p Function) -> Result<FunctionSummary, SummaryError> {
        self.next_goroutine = 0;
        self.stack.clear();
        self.stack.push(&entry.name);
        let result = self.summarize_body(entry, GoroutineState::new(GoroutineId::ROOT));
        self.stack.pop();
        result
    }

    /// Summarize one call under `state`.
    ///
    /// `site` is the position of the call instruction, used for error reports
    /// and for accesses attributed to builtins.
    pub fn summarize_function(
        &mut self,
        call: &'p CallCommon,
        site: Option<&'p Span>,
        mut state: GoroutineState,
    ) -> Result<FunctionSummary, SummaryError> {
        if let Some(name) = call.callee_name() {
            let locks = &self.config.locks;
            if locks.is_acquire(name) || locks.is_release(name) {
                match call.receiver() {
                    Some(receiver) if locks.is_acquire(name) => {
                        state.acquire(LockId::of(receiver))
                    }
                    Some(receiver) => state.release(&LockId::of(receiver)),
                    None => tracing::warn!(callee = name, "lock call without receiver ignored"),
                }
                return Ok(FunctionSummary::opaque(state));
            }
        }

        let target = match &call.callee {
            Callee::Builtin { name } => {
                let builtins = self.builtins;
                let mut accesses = AccessLog::new();
                for (value, kind) in builtins.accesses(name, &call.args) {
                    self.record(&mut accesses, site, value, kind, &state);
                }
                return Ok(FunctionSummary {
                    function: None,
                    accesses,
                    state,
                });
            }
            Callee::Function { name } => name.as_str(),
            Callee::Closure { function } => function.as_str(),
            Callee::Dynamic { value } => {
                return Err(SummaryError::UnresolvedCallee {
                    function: self.current_function().to_string(),
                    value: value.name.clone(),
                    position: site
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "<unknown>".to_string()),
                });
            }
        };

        let Some(func) = self.functions.get(target).copied().filter(|f| f.has_body()) else {
            tracing::trace!(callee = target, "callee has no body, left opaque");
            return Ok(FunctionSummary::opaque(state));
        };
        if !self.config.scope.contains(&func.package) {
            return Ok(FunctionSummary::opaque(state));
        }
        if self.stack.contains(&func.name.as_str()) || self.stack.len() >= self.config.max_depth {
            tracing::debug!(
                func = %func.name,
                depth = self.stack.len(),
                "recursion guard hit, call left opaque"
            );
            return Ok(FunctionSummary::opaque(state));
        }

        self.stack.push(&func.name);
        let result = self.summarize_body(func, state);
        self.stack.pop();
        result
    }

    /// Summarize one basic block of the function on top of the stack.
    pub fn summarize_block(
        &mut self,
        block: &'p BasicBlock,
        mut state: GoroutineState,
    ) -> Result<BlockSummary<'p>, SummaryError> {
        let mut accesses = AccessLog::new();
        let mut deferred = Vec::new();

        for instr in &block.instructions {
            let at = instr.span.as_ref();
            match &instr.op {
                Op::UnOp { x }
                | Op::Field { x }
                | Op::FieldAddr { x }
                | Op::Index { x }
                | Op::IndexAddr { x }
                | Op::Lookup { x }
                | Op::Panic { x }
                | Op::Range { x }
                | Op::TypeAssert { x } => {
                    self.record(&mut accesses, at, x, AccessKind::Read, &state);
                }
                Op::If { cond } => {
                    self.record(&mut accesses, at, cond, AccessKind::Read, &state);
                }
                Op::BinOp { x, y, .. } => {
                    self.record(&mut accesses, at, x, AccessKind::Read, &state);
                    self.record(&mut accesses, at, y, AccessKind::Read, &state);
                }
                Op::MapUpdate { map, value } => {
                    self.record(&mut accesses, at, map, AccessKind::Write, &state);
                    self.record(&mut accesses, at, value, AccessKind::Read, &state);
                }
                Op::Store { addr, val } => {
                    self.record(&mut accesses, at, val, AccessKind::Read, &state);
                    self.record(&mut accesses, at, addr, AccessKind::Write, &state);
                }
                Op::Call { call } => {
                    let summary = self.summarize_function(call, at, state.copy())?;
                    accesses.extend(summary.accesses);
                    state.merge_states(summary.state, false);
                }
                Op::Go { call } => {
                    // The child starts from the clock before the spawner ticks.
                    let child = state.spawn(self.fresh_goroutine());
                    state.increment();
                    let summary = self.summarize_function(call, at, child)?;
                    accesses.extend(summary.accesses);
                }
                Op::Defer { call } => deferred.push(ConditionalFunction {
                    call,
                    site: at,
                    is_conditional: false,
                }),
                Op::Unhandled => {}
            }
        }

        Ok(BlockSummary {
            deferred,
            accesses,
            state,
        })
    }

    fn summarize_body(
        &mut self,
        func: &'p Function,
        mut state: GoroutineState,
    ) -> Result<FunctionSummary, SummaryError> {
        let mut accesses = AccessLog::new();
        let mut deferred: Vec<ConditionalFunction<'p>> = Vec::new();

        for block in &func.blocks {
            let is_conditional = is_conditional_block(block);
            let summary = self.summarize_block(block, state.copy())?;
            accesses.extend(summary.accesses);
            state.merge_states(summary.state, is_conditional);
            deferred.extend(summary.deferred.into_iter().map(|d| ConditionalFunction {
                is_conditional,
                ..d
            }));
        }

        for d in deferred.into_iter().rev() {
            let summary = self.summarize_function(d.call, d.site, state.copy())?;
            accesses.extend(summary.accesses);
            state.merge_states(summary.state, d.is_conditional);
        }

        Ok(FunctionSummary {
            function: Some(func.name.clone()),
            accesses,
            state,
        })
    }

    fn record(
        &mut self,
        log: &mut AccessLog,
        position: Option<&Span>,
        value: &Value,
        kind: AccessKind,
        state: &GoroutineState,
    ) {
        let function = self.current_function();
        let access = log.record(position, value, kind, state, function);
        self.per_function
            .entry(function.to_string())
            .or_default()
            .push(access.clone());
    }

    fn current_function(&self) -> &'p str {
        self.stack.last().copied().unwrap_or(NO_FUNCTION)
    }

    fn fresh_goroutine(&mut self) -> GoroutineId {
        self.next_goroutine += 1;
        GoroutineId(self.next_goroutine)
    }
}
