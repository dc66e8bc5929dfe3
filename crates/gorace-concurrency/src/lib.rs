//! gorace concurrency - lockset and vector-clock summaries for static data race detection

pub mod access;
pub mod analysis;
pub mod builtin;
pub mod clock;
pub mod goroutine;
pub mod identity;
pub mod lockset;
pub mod options;
pub mod oracle;
pub mod summary;
