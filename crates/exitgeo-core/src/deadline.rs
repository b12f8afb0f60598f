//! Deadlines as cancellation tokens
//!
//! Every tier observes a single [`CancellationToken`]. A deadline is a
//! child token that a timer task cancels when the duration elapses.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A token cancelled after `timeout`, or earlier when `parent` is
///
/// Dropping the returned guard cancels the token and ends the timer task,
/// so nothing outlives the call that created the deadline.
pub fn deadline(parent: &CancellationToken, timeout: Duration) -> (CancellationToken, DropGuard) {
    let token = parent.child_token();
    let timer = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });

    let guard = token.clone().drop_guard();
    (token, guard)
}

/// Run `fut` unless `cancel` fires first
///
/// Returns `None` when the token won; `fut` is dropped at that point.
pub async fn until_cancelled<F>(cancel: &CancellationToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
