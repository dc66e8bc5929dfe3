//! gorace diagnostics: diagnostic types, rule catalog, and terminal output.

pub mod diagnostic;
pub mod human;
pub mod rules;

pub use diagnostic::*;
