//! Cancellable execution of a bound prepared statement.
//!
//! Execution runs through the engine's pending-result protocol. While the
//! blocking execute call is in flight, a scoped watcher thread races the
//! caller's cancellation token against a completion signal and interrupts the
//! connection if the token wins. The watcher is always joined before
//! returning, so an interrupt can never land on a later query.

use std::pin::pin;
use std::thread;

use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::{Either, select};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::{InterruptHandle, PendingHandle, PreparedHandle, ResultHandle};

/// Execute `prepared`, interrupting it if `token` is cancelled first.
pub(crate) fn execute(
    prepared: &PreparedHandle,
    interrupt: InterruptHandle,
    token: &CancellationToken,
) -> DuckDbResult<ResultHandle> {
    if token.is_cancelled() {
        return Err(DuckDbError::Cancelled);
    }

    let pending = PendingHandle::from_prepared(prepared)?;
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let (outcome, interrupted) = thread::scope(|scope| {
        let watcher = scope.spawn(move || {
            let cancelled = pin!(token.cancelled());
            match block_on(select(cancelled, done_rx)) {
                Either::Left(((), mut done_rx)) => {
                    if let Ok(Some(())) = done_rx.try_recv() {
                        return false;
                    }
                    debug!("cancellation requested, interrupting connection");
                    interrupt.interrupt();
                    true
                }
                Either::Right(_) => false,
            }
        });

        let outcome = pending.execute();
        // The receiver only disappears once the watcher has already finished.
        let _ = done_tx.send(());
        let interrupted = watcher.join().unwrap_or(false);
        (outcome, interrupted)
    });

    match outcome {
        Ok(result) => {
            crate::ducklink_debug!(interrupted, "execution finished");
            Ok(result)
        }
        Err(_) if interrupted || token.is_cancelled() => Err(DuckDbError::Cancelled),
        Err(text) => Err(DuckDbError::Engine(text)),
    }
}
