//! Join-all fan-out with per-unit failure isolation.
//!
//! Every unit runs to completion. A unit that returns `Err` or panics is
//! reported in its own slot and never cancels or poisons its siblings.
//! Units are polled concurrently on the caller's task; nothing is spawned.

use futures::future::{join_all, FutureExt};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::domain::errors::panic_message;

/// Why an isolated unit produced no value
#[derive(Debug)]
pub enum UnitFailure<E> {
    /// The unit returned `Err`
    Error(E),
    /// The unit panicked; carries the panic message
    Panicked(String),
}

impl<E: fmt::Display> fmt::Display for UnitFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// Run all `units` concurrently and collect one outcome per unit.
///
/// Outcomes come back in input order so callers can pair them with the
/// inputs for logging; consumers must not rely on completion order.
pub async fn join_isolated<I, F, T, E>(units: I) -> Vec<Result<T, UnitFailure<E>>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let guarded = units.into_iter().map(|unit| {
        AssertUnwindSafe(unit).catch_unwind().map(|outcome| match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(UnitFailure::Error(e)),
            Err(payload) => Err(UnitFailure::Panicked(panic_message(payload.as_ref()))),
        })
    });

    join_all(guarded).await
}
