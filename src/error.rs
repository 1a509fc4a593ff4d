//! Error taxonomy for a harvest run.
//!
//! Every failure class maps to exactly one variant so callers (and the
//! `vnr` binary) can report a single message per class. Transport errors
//! are the only retryable kind; everything else aborts the run before the
//! store is written.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Network or HTTP failure talking to the catalog service.
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A single VN kept failing after every retry; the run is aborted.
    #[error("giving up on {vn_id} after {attempts} attempts")]
    RetriesExhausted {
        vn_id: String,
        attempts: u32,
        #[source]
        source: Box<HarvestError>,
    },

    /// A birthday array that is not `[month, day]`.
    #[error("birthday must be [month, day], got {len} element(s)")]
    InvalidBirthday { len: usize },

    #[error("no VN ids given (use --vn-ids or --top-vns)")]
    NoVnIds,

    #[error("no VNs to fetch: every requested id is already in the store")]
    NoNewVns,

    #[error("no top VNs returned by the catalog")]
    NoTopVns,

    #[error("no characters fetched")]
    NoCharacters,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Conditions that end the run without anything being wrong with the
    /// data or the network: there is simply nothing to do.
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(
            self,
            HarvestError::NoVnIds
                | HarvestError::NoNewVns
                | HarvestError::NoTopVns
                | HarvestError::NoCharacters
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, HarvestError::Transport(_))
    }
}

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;
