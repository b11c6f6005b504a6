//! Bounded graceful shutdown
//!
//! axum's graceful shutdown waits for every in-flight request. Synthesis
//! can take minutes, so the drain is capped at the configured timeout.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::Notify;
use tracing::warn;

/// Drive `server` to completion, or give up `timeout` after `shutdown_started`
///
/// Returns `Ok(())` when the deadline forces the exit; in-flight requests are
/// dropped at that point.
pub async fn run_until_drained<F, E>(
    server: F,
    shutdown_started: Arc<Notify>,
    timeout: Duration,
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    let deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(timeout).await;
    };

    tokio::pin!(server);
    tokio::select! {
        result = &mut server => result,
        () = deadline => {
            warn!(?timeout, "In-flight requests did not finish in time, forcing shutdown");
            Ok(())
        }
    }
}
