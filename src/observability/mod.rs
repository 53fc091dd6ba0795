//! Log output for the retention job.
//!
//! Structured logging through `tracing`, printed with a configurable format
//! (pretty, compact, JSON) and filtered by level or `RUST_LOG`.

mod tracing_init;

pub use tracing_init::*;
