//! Pass diagnostics.
//!
//! Every transformation pass emits a debug trace of its decisions: merge
//! candidates, accepted merges, rejected defaults, disambiguation outcomes.
//! The trace rides on `tracing` and its format is not part of any contract.

/// Span covering one transformation pass.
pub fn pass_span(pass: &'static str) -> tracing::Span {
    tracing::debug_span!("pass", name = pass)
}

/// Logs one decision taken by a pass.
#[macro_export]
macro_rules! trace_pass {
    ($pass:expr, $($arg:tt)*) => {
        tracing::debug!(pass = $pass, $($arg)*);
    }
}
