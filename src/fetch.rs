//! Paced, retrying character fetch.
//!
//! The catalog enforces an undocumented rate limit, so the orchestrator
//! spaces requests with unconditional sleeps:
//!
//! 1. one full [`PacingPolicy::batch_interval`] before the first request,
//! 2. [`PacingPolicy::item_delay`] before every VN,
//! 3. a back-off of `backoff_base ^ n` seconds before retry `n + 1` of the
//!    same VN (transport errors only),
//! 4. another full interval after every `batch_size` VNs that returned
//!    characters.
//!
//! Exhausting the retries of a single VN aborts the whole fetch. Nothing is
//! written anywhere until the fetch has completed.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PacingConfig;
use crate::error::{HarvestError, Result};
use crate::ids::canonical_vn_id;
use crate::models::CharacterRecord;
use crate::traits::{CatalogClient, Pause, Sleeper};

/// Upper bound for a single back-off sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Seconds to a duration; negative or NaN becomes zero, overflow `cap`.
fn secs_to_duration(secs: f64, cap: Duration) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(delay) => delay.min(cap),
        Err(_) if secs > 0.0 => cap,
        Err(_) => Duration::ZERO,
    }
}

/// Sleep points and retry budget of a fetch run.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingPolicy {
    pub batch_interval: Duration,
    pub item_delay: Duration,
    pub batch_size: usize,
    pub backoff_base: f64,
    pub max_retries: u32,
}

impl PacingPolicy {
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            batch_interval: secs_to_duration(config.batch_interval_secs, Duration::MAX),
            item_delay: secs_to_duration(config.item_delay_secs, Duration::MAX),
            batch_size: config.batch_size.max(1),
            backoff_base: config.backoff_base,
            max_retries: config.max_retries,
        }
    }

    /// Delay after failed attempt number `attempt` (0-based), at most
    /// [`MAX_BACKOFF`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        secs_to_duration(self.backoff_base.powi(exponent), MAX_BACKOFF)
    }

    /// Rough wall-clock time for fetching `vn_count` VNs, ignoring
    /// request latency and retries.
    pub fn estimate(&self, vn_count: usize) -> Duration {
        let count = u32::try_from(vn_count).unwrap_or(u32::MAX);
        let batches = u32::try_from(vn_count / self.batch_size + 1).unwrap_or(u32::MAX);
        self.item_delay
            .saturating_mul(count)
            .saturating_add(self.batch_interval.saturating_mul(batches))
    }
}

/// Fetch the characters of every VN in `vn_ids`, in order.
///
/// Each returned record carries its originating VN id in `origin`.
pub async fn fetch_characters(
    client: &dyn CatalogClient,
    vn_ids: &[String],
    policy: &PacingPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Vec<CharacterRecord>> {
    info!(
        secs = policy.batch_interval.as_secs_f64(),
        "Sleeping before first request to avoid rate limits"
    );
    sleeper.sleep(Pause::Warmup, policy.batch_interval).await;

    let mut characters = Vec::new();
    let mut fetched_since_pause = 0usize;

    for raw_id in vn_ids {
        let vn_id = canonical_vn_id(raw_id);
        debug!(%vn_id, "Fetching characters");
        sleeper.sleep(Pause::Item, policy.item_delay).await;

        let batch = fetch_with_retry(client, &vn_id, policy, sleeper).await?;
        if batch.is_empty() {
            warn!(%vn_id, "No characters found");
        } else {
            debug!(%vn_id, count = batch.len(), "Fetched characters");
            characters.extend(batch.into_iter().map(|ch| tag_origin(ch, &vn_id)));
            fetched_since_pause += 1;
        }

        if fetched_since_pause >= policy.batch_size {
            info!(
                vns = fetched_since_pause,
                secs = policy.batch_interval.as_secs_f64(),
                "Batch complete, pausing"
            );
            sleeper.sleep(Pause::Batch, policy.batch_interval).await;
            fetched_since_pause = 0;
        }
    }

    Ok(characters)
}

async fn fetch_with_retry(
    client: &dyn CatalogClient,
    vn_id: &str,
    policy: &PacingPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Vec<CharacterRecord>> {
    let mut attempt = 0u32;
    loop {
        match client.characters_by_vn(vn_id).await {
            Ok(batch) => return Ok(batch),
            Err(err) if err.is_transport() => {
                if attempt >= policy.max_retries {
                    return Err(HarvestError::RetriesExhausted {
                        vn_id: vn_id.to_string(),
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
                let delay = policy.backoff_delay(attempt);
                attempt += 1;
                info!(
                    %vn_id,
                    error = %err,
                    retry_in_secs = delay.as_secs_f64(),
                    "Request failed, retrying"
                );
                sleeper.sleep(Pause::Backoff { attempt }, delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn tag_origin(character: CharacterRecord, vn_id: &str) -> CharacterRecord {
    CharacterRecord {
        origin: Some(vn_id.to_string()),
        ..character
    }
}
