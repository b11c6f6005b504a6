//! Stale artifact eviction task
//!
//! Asks the synthesis worker to drop artifacts it considers stale. The
//! worker owns the retention policy; this task only sets the cadence.

use std::sync::Arc;
use std::time::Duration;

use application::SynthesisPort;
use tracing::{debug, info, warn};

/// Spawn a task that calls `evict_stale_artifacts` every `interval`
///
/// Returns `None` when `interval` is zero, which disables eviction. The
/// first run happens one interval after startup.
pub fn spawn_cache_eviction_task(
    synthesis: Arc<dyn SynthesisPort>,
    interval: Duration,
) -> Option<tokio::task::JoinHandle<()>> {
    if interval.is_zero() {
        info!("Cache eviction disabled");
        return None;
    }

    info!(interval_secs = interval.as_secs(), "Starting cache eviction task");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_once(synthesis.as_ref()).await;
        }
    }))
}

async fn run_once(synthesis: &dyn SynthesisPort) {
    match synthesis.evict_stale_artifacts().await {
        Ok(0) => debug!("No stale artifacts to evict"),
        Ok(removed) => info!(removed, "Evicted stale artifacts"),
        Err(e) => warn!(error = %e, "Cache eviction failed"),
    }
}
