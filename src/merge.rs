//! Deduplication and store merging.
//!
//! Identity is `(id, name)` for characters and `id` for VNs. The first
//! occurrence of an identity wins; later ones are dropped. Merged
//! collections are ordered by the numeric part of their ids.

use std::collections::HashSet;

use crate::ids::id_sort_key;
use crate::models::{CharacterRecord, VnEntry};

pub fn dedup_characters(records: Vec<CharacterRecord>) -> Vec<CharacterRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.id.clone(), r.name.clone())))
        .collect()
}

pub fn dedup_vns(vns: Vec<VnEntry>) -> Vec<VnEntry> {
    let mut seen = HashSet::new();
    vns.into_iter().filter(|vn| seen.insert(vn.id.clone())).collect()
}

/// Existing records followed by new ones, deduplicated and id-sorted.
pub fn merge_characters(
    existing: Vec<CharacterRecord>,
    new: Vec<CharacterRecord>,
) -> Vec<CharacterRecord> {
    let mut merged = dedup_characters(existing.into_iter().chain(new).collect());
    sort_characters(&mut merged);
    merged
}

pub fn merge_vns(existing: Vec<VnEntry>, new: Vec<VnEntry>) -> Vec<VnEntry> {
    let mut merged = dedup_vns(existing.into_iter().chain(new).collect());
    sort_vns(&mut merged);
    merged
}

pub fn sort_characters(records: &mut [CharacterRecord]) {
    records.sort_by_cached_key(|r| id_sort_key(&r.id));
}

pub fn sort_vns(vns: &mut [VnEntry]) {
    vns.sort_by_cached_key(|vn| id_sort_key(&vn.id));
}

/// Drop requested VN ids that are already present in the store.
pub fn missing_vn_ids(requested: Vec<String>, existing: &[VnEntry]) -> Vec<String> {
    let known: HashSet<&str> = existing.iter().map(|vn| vn.id.as_str()).collect();
    requested
        .into_iter()
        .filter(|id| !known.contains(id.as_str()))
        .collect()
}

/// Remove repeated ids, keeping the first occurrence.
pub fn unique_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(id: &str, name: &str) -> CharacterRecord {
        CharacterRecord {
            id: id.to_string(),
            name: name.to_string(),
            ..CharacterRecord::default()
        }
    }

    fn vn(id: &str) -> VnEntry {
        VnEntry {
            id: id.to_string(),
            title: format!("Title {}", id),
        }
    }

    #[test]
    fn test_dedup_characters_by_id_and_name() {
        let out = dedup_characters(vec![ch("c1", "A"), ch("c1", "A"), ch("c1", "B")]);
        let keys: Vec<_> = out.iter().map(|r| (r.id.as_str(), r.name.as_str())).collect();
        assert_eq!(keys, vec![("c1", "A"), ("c1", "B")]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut first = ch("c1", "A");
        first.age = Some(10);
        let mut second = ch("c1", "A");
        second.age = Some(20);
        let out = dedup_characters(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].age, Some(10));
    }

    #[test]
    fn test_merge_vns_numeric_order() {
        let merged = merge_vns(vec![vn("v10"), vn("v2")], vec![vn("v1")]);
        let ids: Vec<_> = merged.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v10"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![ch("c10", "J"), ch("c3", "C")];
        let new = vec![ch("c3", "C"), ch("c4", "D")];

        let once = merge_characters(existing, new.clone());
        let twice = merge_characters(once.clone(), new);
        assert_eq!(once, twice);
        let ids: Vec<_> = once.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c4", "c10"]);
    }

    #[test]
    fn test_missing_vn_ids() {
        let out = missing_vn_ids(
            vec!["v1".to_string(), "v2".to_string(), "v3".to_string()],
            &[vn("v2")],
        );
        assert_eq!(out, vec!["v1", "v3"]);
    }

    #[test]
    fn test_unique_ids_keeps_order() {
        let out = unique_ids(vec!["v5".into(), "v1".into(), "v5".into()]);
        assert_eq!(out, vec!["v5", "v1"]);
    }
}
