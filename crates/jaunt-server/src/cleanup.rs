use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use jaunt_api::AppState;
use jaunt_store::{DiskStore, ObjectStore};

/// Background task that prunes orphaned objects: keys that were signed (or
/// uploaded) but never committed as media or attachments. Objects younger
/// than the grace period are left alone so in-flight uploads survive.
pub async fn run_cleanup_loop(
    state: AppState,
    store: Arc<DiskStore>,
    interval_secs: u64,
    grace_hours: u64,
) {
    let grace = Duration::from_secs(grace_hours * 3600);
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match sweep_orphans(&state, &store, grace).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: pruned {} orphaned objects", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}

async fn sweep_orphans(
    state: &AppState,
    store: &Arc<DiskStore>,
    grace: Duration,
) -> anyhow::Result<usize> {
    let stale = store.list_stale_keys(grace).await?;
    if stale.is_empty() {
        return Ok(0);
    }

    let db = state.clone();
    let referenced =
        tokio::task::spawn_blocking(move || db.db.referenced_storage_keys()).await??;

    let mut pruned = 0;
    for key in stale {
        if referenced.contains(&key) {
            continue;
        }
        if let Err(e) = store.delete(&key).await {
            warn!("Failed to delete orphan {}: {}", key, e);
            continue;
        }
        pruned += 1;
    }

    Ok(pruned)
}
