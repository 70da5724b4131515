//! Error types for overhead runs.
//!
//! A mismatch between baseline and instrumented results means the instrumentation
//! wrapper changed what the kernel computed, so every timing collected in that run
//! is void. Those cases are surfaced here rather than returned as partial data.

use thiserror::Error;

/// Result type alias for overhead runs.
pub type BenchResult<T> = Result<T, BenchError>;

/// Errors that abort an overhead run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BenchError {
    /// Matrix checksum differs between the baseline and instrumented passes.
    #[error("baseline result != instrumentation result: {baseline} vs. {instrumented}")]
    ChecksumMismatch { baseline: f64, instrumented: f64 },

    /// Fibonacci return values disagree between two passes.
    #[error("answer mismatch ({context}): {expected} vs. {actual}")]
    AnswerMismatch {
        context: &'static str,
        expected: u128,
        actual: u128,
    },

    /// The adapter saw a different number of instrumentation events than the count pass predicted.
    #[error("instrumentation event count mismatch: expected {expected} vs. issued {actual}")]
    EventCountMismatch { expected: u64, actual: u64 },

    /// The requested kernel flavor was not compiled into this build.
    #[error("kernel flavor `{0}` is not compiled in")]
    KernelUnavailable(&'static str),

    /// Parameters outside the range the kernels can compute.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
