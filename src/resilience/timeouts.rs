//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Cancel the in-flight future when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from the wrapped call's own errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

/// Outcome of a deadline-bounded call.
#[derive(Debug)]
pub enum Bounded<T, E> {
    Completed(T),
    Failed(E),
    TimedOut,
}

/// Run `fut` with a deadline. The future is dropped when the deadline passes.
pub async fn with_deadline<F, T, E>(deadline: Duration, fut: F) -> Bounded<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Bounded::Completed(value),
        Ok(Err(e)) => Bounded::Failed(e),
        Err(_) => Bounded::TimedOut,
    }
}
