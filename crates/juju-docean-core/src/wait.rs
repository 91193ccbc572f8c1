//! Bounded polling
//!
//! A check is retried at a fixed interval until it yields a value or the
//! deadline passes. A check still running at the deadline is abandoned, so
//! the wait never outlives its budget, and a check error ends the wait
//! immediately.

use juju_docean_config::WaitConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};

/// Why a wait ended without a value
#[derive(Debug)]
pub enum WaitError<E> {
    /// Deadline passed
    TimedOut { waited: Duration, attempts: u32 },
    /// The check itself failed
    Check(E),
}

/// Poll `check` until it returns `Some`, bounded by `wait`
pub async fn poll_until<T, E, F, Fut>(wait: WaitConfig, check: F) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    poll_until_deadline(started, started + wait.timeout, wait.interval, check).await
}

/// Poll `check` until it returns `Some` or `deadline` passes.
///
/// `started` is only used to report how long the wait took, so several
/// phases can share one deadline.
pub async fn poll_until_deadline<T, E, F, Fut>(
    started: Instant,
    deadline: Instant,
    interval: Duration,
    mut check: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let timed_out = |attempts| WaitError::TimedOut {
        waited: Instant::now().min(deadline).saturating_duration_since(started),
        attempts,
    };
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match timeout_at(deadline, check()).await {
            Ok(Ok(Some(value))) => return Ok(value),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(WaitError::Check(e)),
            Err(_) => return Err(timed_out(attempts)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(attempts));
        }
        sleep(interval.min(deadline - now)).await;
    }
}
