//! # vn-roster
//!
//! Harvests visual-novel characters from the VNDB catalog into a versioned,
//! deduplicated JSON store that grows across runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//! │  Catalog API │──▶│ Paced fetch  │──▶│ Label + norm │──▶│ Merge into │
//! │ (paginated)  │   │ retry/backoff│   │   pipeline   │   │ JSON store │
//! └──────────────┘   └──────────────┘   └──────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vnr fetch --vn-ids v17 v11 --out data/db.json
//! vnr fetch --top-vns 5 --out data/db.json --append
//! vnr fetch --vn-ids 17 --raw          # dump catalog records and stop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`ids`] | Id canonicalization and numeric ordering |
//! | [`models`] | Core data types |
//! | [`traits`] | Catalog and sleeper seams |
//! | [`client`] | VNDB HTTP client |
//! | [`fetch`] | Paced, retrying fetch orchestrator |
//! | [`scoring`] | Signature-trait selection |
//! | [`normalize`] | Record normalization pipeline |
//! | [`merge`] | Dedup and merge |
//! | [`store`] | JSON store persistence |
//! | [`harvest`] | End-to-end run |
//! | [`logging`] | Tracing setup |

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod harvest;
pub mod ids;
pub mod logging;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod scoring;
pub mod store;
pub mod traits;
