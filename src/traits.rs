//! Extension seams between the run logic and the outside world.
//!
//! The fetch orchestrator and the harvest run only talk to the catalog
//! through [`CatalogClient`] and only wait through [`Sleeper`]. The
//! production implementations are [`crate::client::VndbClient`] and
//! [`TokioSleeper`]; tests plug in in-memory catalogs and sleepers that
//! record instead of waiting.
//!
//! ```text
//!   harvest::run_harvest
//!          │
//!          ├──▶ CatalogClient  (VndbClient │ in-memory)
//!          └──▶ Sleeper        (TokioSleeper │ recording)
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::models::{CharacterRecord, VnEntry};

/// Paging spec for a sorted VN listing.
#[derive(Debug, Clone, PartialEq)]
pub struct VnListQuery {
    /// Number of pages to request.
    pub pages: u32,
    /// First page (1-based).
    pub start: u32,
    pub sort: String,
    pub reverse: bool,
}

/// Remote catalog with two logical resources: characters by VN and VNs.
///
/// Implementations accumulate every page before returning and surface
/// transport failures unchanged; retrying is the caller's job.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// All main/primary characters of one VN. `vn_id` may be given with or
    /// without its `v` prefix.
    async fn characters_by_vn(&self, vn_id: &str) -> Result<Vec<CharacterRecord>>;

    /// Look up a single VN by id.
    async fn vn_by_id(&self, vn_id: &str) -> Result<Option<VnEntry>>;

    /// A sorted listing of VNs.
    async fn list_vns(&self, query: &VnListQuery) -> Result<Vec<VnEntry>>;
}

/// Why the orchestrator is pausing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pause {
    /// Full interval before the first request.
    Warmup,
    /// Short delay before each VN.
    Item,
    /// Back-off before retry number `attempt` (1-based).
    Backoff { attempt: u32 },
    /// Full interval after a completed batch.
    Batch,
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, pause: Pause, duration: Duration);
}

/// Real sleeping on the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, _pause: Pause, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
