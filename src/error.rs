//! Failure taxonomy for the engine core
//!
//! None of these are fatal to the process: every variant degrades to
//! "skip and log" at the call site that observes it, and the cycle is
//! retried naturally on the next invocation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bar or quote fetch failed or came back empty
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// Zero-width session range or zero total session volume
    #[error("degenerate session: {0}")]
    DegenerateRange(String),

    /// Candidate stop/target inside the minimum stop distance, or a
    /// sizing misconfiguration
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Order placement, modify or close rejected by the execution venue
    #[error("execution rejected: {0}")]
    ExecutionRejected(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
