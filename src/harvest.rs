//! End-to-end harvest run.
//!
//! Coordinates the full flow: resolve VN ids → paced character fetch →
//! (raw dump) → dedup → labeling → normalization → merge → store write.
//!
//! The store is read once up front (append mode) and written once at the
//! end; any failure in between leaves it untouched.

use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::{HarvestError, Result};
use crate::fetch::{fetch_characters, PacingPolicy};
use crate::ids::canonical_vn_id;
use crate::merge::{dedup_characters, merge_characters, merge_vns, missing_vn_ids, unique_ids};
use crate::models::{CharacterRecord, VnEntry};
use crate::normalize::normalize_records;
use crate::scoring::{label_records, TraitPolicy};
use crate::store::{read_store, to_canonical_json, write_atomic, write_store, Store};
use crate::traits::{CatalogClient, Sleeper, VnListQuery};

/// What to harvest and where to put it.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Explicit VN ids, with or without the `v` prefix.
    pub vn_ids: Vec<String>,
    /// Number of sorted-listing pages to add; 0 disables the listing.
    pub top_pages: u32,
    pub start_page: u32,
    pub sort: String,
    pub out: Option<PathBuf>,
    pub append: bool,
    /// Dump the origin-tagged catalog records and stop.
    pub raw: bool,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            vn_ids: Vec::new(),
            top_pages: 0,
            start_page: 1,
            sort: "votecount".to_string(),
            out: None,
            append: false,
            raw: false,
        }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestOutcome {
    RawDumped {
        characters: usize,
    },
    Printed {
        records: usize,
    },
    Written {
        path: PathBuf,
        new_records: usize,
        total_characters: usize,
        total_vns: usize,
    },
}

pub struct Harvester<'a> {
    pub client: &'a dyn CatalogClient,
    pub sleeper: &'a dyn Sleeper,
    pub pacing: PacingPolicy,
    pub scoring: TraitPolicy,
}

impl<'a> Harvester<'a> {
    /// Run one harvest. Normalized records go to `stdout` when no output
    /// path is set.
    pub async fn run(&self, opts: &HarvestOptions, stdout: &mut dyn Write) -> Result<HarvestOutcome> {
        let (mut vn_ids, top_vns) = self.resolve_vns(opts).await?;

        let existing = match (&opts.out, opts.append) {
            (Some(path), true) => read_store(path)?.unwrap_or_default(),
            _ => Store::default(),
        };
        if opts.append && opts.out.is_some() {
            vn_ids = missing_vn_ids(vn_ids, &existing.top_vns);
            info!(count = vn_ids.len(), "VNs missing from the current store");
        }
        if vn_ids.is_empty() {
            return Err(HarvestError::NoNewVns);
        }

        let eta = self.pacing.estimate(vn_ids.len());
        info!(
            vns = vn_ids.len(),
            eta_min = %format!("{:.1}", eta.as_secs_f64() / 60.0),
            "Fetching characters"
        );

        let raw = fetch_characters(self.client, &vn_ids, &self.pacing, self.sleeper).await?;
        if raw.is_empty() {
            return Err(HarvestError::NoCharacters);
        }
        info!(count = raw.len(), "Fetched raw characters");

        if opts.raw {
            let payload = to_canonical_json(&raw)?;
            match &opts.out {
                Some(path) => write_atomic(path, &payload)?,
                None => writeln!(stdout, "{}", payload)?,
            }
            return Ok(HarvestOutcome::RawDumped {
                characters: raw.len(),
            });
        }

        let records = prepare_records(raw, &self.scoring)?;
        info!(count = records.len(), "Normalized unique characters");

        let Some(path) = &opts.out else {
            for record in &records {
                let line = serde_json::to_string(&serde_json::to_value(record)?)?;
                writeln!(stdout, "{}", line)?;
            }
            return Ok(HarvestOutcome::Printed {
                records: records.len(),
            });
        };

        let existing_count = existing.characters.len();
        let new_records = records.len();
        let characters = merge_characters(existing.characters, records);
        let vns = merge_vns(existing.top_vns, top_vns);
        info!(
            existing = existing_count,
            new = new_records,
            total = characters.len(),
            "Merged records"
        );

        let store = Store::new(characters, vns);
        write_store(path, &store)?;
        info!(
            records = store.characters.len(),
            top_vns = store.top_vns.len(),
            path = %path.display(),
            "Wrote store"
        );

        Ok(HarvestOutcome::Written {
            path: path.clone(),
            new_records,
            total_characters: store.characters.len(),
            total_vns: store.top_vns.len(),
        })
    }

    /// Explicit ids first, then the sorted listing, without repeats.
    async fn resolve_vns(&self, opts: &HarvestOptions) -> Result<(Vec<String>, Vec<VnEntry>)> {
        let mut vn_ids = Vec::new();
        let mut top_vns = Vec::new();

        for raw in &opts.vn_ids {
            let vn_id = canonical_vn_id(raw);
            match self.client.vn_by_id(&vn_id).await? {
                Some(entry) => top_vns.push(entry),
                None => warn!(%vn_id, "VN not found in catalog"),
            }
            vn_ids.push(vn_id);
        }

        if opts.top_pages > 0 {
            info!(pages = opts.top_pages, sort = %opts.sort, "Fetching top VNs");
            let query = VnListQuery {
                pages: opts.top_pages,
                start: opts.start_page,
                sort: opts.sort.clone(),
                reverse: true,
            };
            let listed = self.client.list_vns(&query).await?;
            if listed.is_empty() {
                return Err(HarvestError::NoTopVns);
            }
            vn_ids.extend(listed.iter().map(|vn| vn.id.clone()));
            top_vns.extend(listed);
        }

        let vn_ids = unique_ids(vn_ids);
        if vn_ids.is_empty() {
            return Err(HarvestError::NoVnIds);
        }
        Ok((vn_ids, top_vns))
    }
}

/// Dedup, label and normalize freshly fetched records.
///
/// Trait frequencies are taken over the deduplicated roster.
pub fn prepare_records(raw: Vec<CharacterRecord>, scoring: &TraitPolicy) -> Result<Vec<CharacterRecord>> {
    let unique = dedup_characters(raw);
    let labeled = label_records(unique, scoring);
    normalize_records(labeled)
}
