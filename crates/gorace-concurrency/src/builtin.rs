//! Memory effects of Go builtins.

use gorace_ir::ir::Value;

use crate::access::AccessKind;

/// Models which operands of a builtin call are read or written.
pub trait BuiltinModel {
    fn accesses<'a>(&self, builtin: &str, args: &'a [Value]) -> Vec<(&'a Value, AccessKind)>;
}

/// Default model for the Go builtins.
///
/// `copy` and `delete` write their first operand, `close` and `clear` write
/// their operand, everything else only reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoBuiltins;

impl BuiltinModel for GoBuiltins {
    fn accesses<'a>(&self, builtin: &str, args: &'a [Value]) -> Vec<(&'a Value, AccessKind)> {
        match builtin {
            "copy" | "delete" => args
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let kind = if i == 0 {
                        AccessKind::Write
                    } else {
                        AccessKind::Read
                    };
                    (v, kind)
                })
                .collect(),
            "close" | "clear" => args.iter().map(|v| (v, AccessKind::Write)).collect(),
            _ => args.iter().map(|v| (v, AccessKind::Read)).collect(),
        }
    }
}
