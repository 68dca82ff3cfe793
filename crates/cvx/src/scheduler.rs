//! ⏰ Scheduler — the outer loop that never clocks out.
//!
//! Connect everything, run one pass, hang up, sleep ten seconds, repeat
//! until the process is terminated. That's the whole job description. No
//! exit condition, no ambition, no performance review.
//!
//! Failures anywhere inside a cycle — cursor store down, catalog refusing
//! the handshake, cluster mid-restart — are caught HERE, at the pass
//! boundary, and retried under the [`RetryPolicy`]. Connections are scoped
//! to one attempt: acquired at the top, released on every exit path,
//! including the disappointing ones. The Postgres driver task in particular
//! gets aborted unconditionally, because a zombie connection task is the
//! gift nobody asked for.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::catalog::PgCatalog;
use crate::cursor::RedisCursorStore;
use crate::error::SyncError;
use crate::orchestrator::{self, PassSummary};
use crate::retry::RetryPolicy;
use crate::sink::ElasticsearchSink;

/// 🚀 Run the sync loop forever (or until a bounded retry policy gives up,
/// for deployments that prefer a crash-loop to a quiet sulk).
pub(crate) async fn run(config: AppConfig) -> anyhow::Result<()> {
    let policy = RetryPolicy::from_runtime(&config.runtime);
    let interval = Duration::from_secs(config.runtime.sync_interval_secs);

    loop {
        sync_until_success(&config, &policy).await?;
        sleep(interval).await;
    }
}

/// 🔄 One cycle: attempt connect-and-pass until it succeeds or the policy
/// runs out of patience.
async fn sync_until_success(config: &AppConfig, policy: &RetryPolicy) -> anyhow::Result<()> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match connect_and_sync(config).await {
            Ok(summary) => {
                info!(upserted = summary.upserted, attempt, "✅ sync cycle complete");
                return Ok(());
            }
            Err(err) if policy.should_retry(attempt) => {
                // Transient or permanent, the policy currently retries both —
                // but the logs know the difference, and so should you.
                let delay = policy.delay(attempt);
                warn!(
                    error = %err,
                    fault = %err.kind(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "💀 sync attempt failed, backing off"
                );
                sleep(delay).await;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("💀 sync gave up after {attempt} attempts. The backoff did its best.")));
            }
        }
    }
}

/// 📡 Acquire every dependency, run exactly one pass, release everything.
async fn connect_and_sync(config: &AppConfig) -> Result<PassSummary, SyncError> {
    // Order matters only for cleanup: the Postgres driver task is the one
    // resource that outlives its handle, so it's acquired last and aborted
    // unconditionally below. Redis and reqwest clean up on drop like adults.
    let mut cursors = RedisCursorStore::connect(&config.cursor_store.url).await?;
    let mut sink = ElasticsearchSink::new(config.sink.clone()).await?;
    let (catalog, driver) =
        PgCatalog::connect(&config.catalog, config.runtime.changeset_page_size).await?;

    let result = orchestrator::run_pass(&catalog, &mut sink, &mut cursors, &config.runtime).await;

    // 🗑️ Every exit path hangs up the phone. Success, failure, indifference.
    driver.abort();
    result
}
