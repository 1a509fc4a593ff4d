//! End-to-end harvest runs against an in-memory catalog.
//!
//! These tests drive `Harvester::run` through the real fetch, labeling,
//! normalization, merge and store code; only the network and the clock
//! are replaced.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use vn_roster::error::{HarvestError, Result};
use vn_roster::fetch::PacingPolicy;
use vn_roster::harvest::{HarvestOptions, HarvestOutcome, Harvester};
use vn_roster::models::{CharacterRecord, VnEntry};
use vn_roster::scoring::TraitPolicy;
use vn_roster::store::{read_store, write_store, Store};
use vn_roster::traits::{CatalogClient, Pause, Sleeper, VnListQuery};

// ─── Test Catalog ───────────────────────────────────────────────────

struct InMemoryCatalog {
    characters: HashMap<String, Vec<Value>>,
    vns: Vec<VnEntry>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryCatalog {
    fn new() -> Self {
        let mut characters = HashMap::new();
        characters.insert(
            "v2".to_string(),
            vec![
                character("c20", "Nagisa", "v2", [12, 24], &[("i1", "Kind", "Personality"), ("i2", "Brown", "Hair")]),
                character("c3", "Sanae", "v2", [8, 30], &[("i1", "Kind", "Personality"), ("i9", "X", "Subject of (Sexual)")]),
            ],
        );
        characters.insert(
            "v10".to_string(),
            vec![
                character("c100", "Ayu", "v10", [1, 7], &[("i3", "Hair Band", "Hair"), ("i4", "Short", "Body")]),
                // also appears in v2's listing; dedup keeps the first
                character("c3", "Sanae", "v10", [8, 30], &[("i1", "Kind", "Personality")]),
            ],
        );
        characters.insert("v5".to_string(), vec![]);

        let vns = vec![
            VnEntry { id: "v2".to_string(), title: "Clannad".to_string() },
            VnEntry { id: "v10".to_string(), title: "Kanon".to_string() },
            VnEntry { id: "v5".to_string(), title: "Empty".to_string() },
        ];

        Self {
            characters,
            vns,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn character(id: &str, name: &str, vn: &str, birthday: [u32; 2], traits: &[(&str, &str, &str)]) -> Value {
    json!({
        "id": id,
        "name": name,
        "age": null,
        "birthday": birthday,
        "sex": ["f", "f"],
        "image": {"url": format!("https://example.org/{}.jpg", id)},
        "traits": traits
            .iter()
            .map(|(tid, tname, group)| json!({"id": tid, "name": tname, "group_name": group}))
            .collect::<Vec<_>>(),
        "vns": [{"id": vn, "role": "main", "released": "2004-04-28",
                 "developers": [{"id": "p1", "name": "Key"}]}]
    })
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn characters_by_vn(&self, vn_id: &str) -> Result<Vec<CharacterRecord>> {
        self.calls.lock().unwrap().push(vn_id.to_string());
        let raw = self.characters.get(vn_id).cloned().unwrap_or_default();
        Ok(raw
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect())
    }

    async fn vn_by_id(&self, vn_id: &str) -> Result<Option<VnEntry>> {
        Ok(self.vns.iter().find(|vn| vn.id == vn_id).cloned())
    }

    async fn list_vns(&self, query: &VnListQuery) -> Result<Vec<VnEntry>> {
        Ok(self.vns.iter().take(query.pages as usize).cloned().collect())
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _pause: Pause, _duration: Duration) {}
}

fn harvester(catalog: &InMemoryCatalog) -> Harvester<'_> {
    Harvester {
        client: catalog,
        sleeper: &NoSleep,
        pacing: PacingPolicy {
            batch_interval: Duration::from_secs(300),
            item_delay: Duration::from_secs(5),
            batch_size: 25,
            backoff_base: 1.5,
            max_retries: 3,
        },
        scoring: TraitPolicy::default(),
    }
}

fn opts(ids: &[&str], out: Option<&Path>, append: bool) -> HarvestOptions {
    HarvestOptions {
        vn_ids: ids.iter().map(|s| s.to_string()).collect(),
        out: out.map(Path::to_path_buf),
        append,
        ..HarvestOptions::default()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_store_is_written() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("db.json");
    let catalog = InMemoryCatalog::new();

    let outcome = harvester(&catalog)
        .run(&opts(&["10", "v2"], Some(&path), false), &mut std::io::sink())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        HarvestOutcome::Written {
            path: path.clone(),
            new_records: 3,
            total_characters: 3,
            total_vns: 2,
        }
    );

    let db = read_json(&path);
    assert_eq!(db["version"], "1.0.0");
    let ids: Vec<_> = db["characters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c3", "c20", "c100"]);
    let vn_ids: Vec<_> = db["top_vns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(vn_ids, vec!["v2", "v10"]);

    // c3 was seen first through v10
    let sanae = &db["characters"][0];
    assert_eq!(sanae["origin"], "v10");
    assert_eq!(sanae["birthday"], "30.08.");
    assert_eq!(sanae["sex"], "f");
    assert_eq!(sanae["non_unique_trait"], "Kind");
    assert_eq!(sanae["Personality"], "Kind");
    assert_eq!(sanae["developer"], "Key");
    assert_eq!(sanae["role"], "main");
    assert_eq!(sanae["image_url"], "https://example.org/c3.jpg");
    assert!(sanae.get("vns").is_none());
    assert!(sanae.get("traits").is_none());
    assert!(sanae.get("image").is_none());

    // Ayu's traits are all unique, so the best-scoring leftover wins
    let ayu = &db["characters"][2];
    assert_eq!(ayu["non_unique_trait"], "Hair Band");
}

#[tokio::test]
async fn test_append_fetches_only_missing_vns() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("db.json");
    let catalog = InMemoryCatalog::new();

    harvester(&catalog)
        .run(&opts(&["v2"], Some(&path), false), &mut std::io::sink())
        .await
        .unwrap();
    assert_eq!(catalog.calls(), vec!["v2"]);

    let outcome = harvester(&catalog)
        .run(&opts(&["v2", "v10"], Some(&path), true), &mut std::io::sink())
        .await
        .unwrap();
    assert_eq!(catalog.calls(), vec!["v2", "v10"]);

    match outcome {
        HarvestOutcome::Written { total_characters, total_vns, .. } => {
            assert_eq!(total_characters, 3);
            assert_eq!(total_vns, 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // the existing c3 (origin v2) is kept over the new one
    let store = read_store(&path).unwrap().unwrap();
    let sanae = store.characters.iter().find(|c| c.id == "c3").unwrap();
    assert_eq!(sanae.origin.as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_append_with_nothing_new_leaves_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("db.json");
    let catalog = InMemoryCatalog::new();

    harvester(&catalog)
        .run(&opts(&["v2"], Some(&path), false), &mut std::io::sink())
        .await
        .unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let err = harvester(&catalog)
        .run(&opts(&["2"], Some(&path), true), &mut std::io::sink())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::NoNewVns));
    assert!(err.is_nothing_to_do());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_bad_birthday_aborts_before_write() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("db.json");
    write_store(&path, &Store::new(vec![], vec![])).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let mut catalog = InMemoryCatalog::new();
    catalog.characters.insert(
        "v2".to_string(),
        vec![json!({"id": "c1", "name": "Odd", "birthday": [1, 2, 3]})],
    );

    let err = harvester(&catalog)
        .run(&opts(&["v2"], Some(&path), true), &mut std::io::sink())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::InvalidBirthday { len: 3 }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_only_empty_vns_is_nothing_fetched() {
    let catalog = InMemoryCatalog::new();
    let err = harvester(&catalog)
        .run(&opts(&["v5"], None, false), &mut std::io::sink())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::NoCharacters));
}

#[tokio::test]
async fn test_no_ids_is_nothing_to_do() {
    let catalog = InMemoryCatalog::new();
    let err = harvester(&catalog)
        .run(&opts(&[], None, false), &mut std::io::sink())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::NoVnIds));
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_stdout_mode_prints_json_lines() {
    let catalog = InMemoryCatalog::new();
    let mut out: Vec<u8> = Vec::new();

    let outcome = harvester(&catalog)
        .run(&opts(&["v2"], None, false), &mut out)
        .await
        .unwrap();
    assert_eq!(outcome, HarvestOutcome::Printed { records: 2 });

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], "c20");
    assert_eq!(lines[0]["Hair"], "Brown");
    assert_eq!(lines[0]["birthday"], "24.12.");
}

#[tokio::test]
async fn test_raw_dump_keeps_nested_fields() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("raw.json");
    let catalog = InMemoryCatalog::new();

    let mut options = opts(&["v2"], Some(&path), false);
    options.raw = true;
    let outcome = harvester(&catalog).run(&options, &mut std::io::sink()).await.unwrap();
    assert_eq!(outcome, HarvestOutcome::RawDumped { characters: 2 });

    let raw = read_json(&path);
    assert_eq!(raw[0]["origin"], "v2");
    assert_eq!(raw[0]["birthday"], json!([12, 24]));
    assert!(raw[0]["traits"].is_array());
    assert!(raw[0].get("non_unique_trait").is_none());
}

#[tokio::test]
async fn test_top_listing_merges_with_explicit_ids() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("db.json");
    let catalog = InMemoryCatalog::new();

    let mut options = opts(&["v10"], Some(&path), false);
    options.top_pages = 2;
    harvester(&catalog).run(&options, &mut std::io::sink()).await.unwrap();

    // v10 requested explicitly and listed: fetched once, stored once
    assert_eq!(catalog.calls(), vec!["v10", "v2"]);
    let store = read_store(&path).unwrap().unwrap();
    let ids: Vec<_> = store.top_vns.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["v2", "v10"]);
}

#[tokio::test]
async fn test_repeated_merge_is_stable() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("db.json");
    let catalog = InMemoryCatalog::new();

    harvester(&catalog)
        .run(&opts(&["v2", "v10"], Some(&path), false), &mut std::io::sink())
        .await
        .unwrap();
    let first = read_store(&path).unwrap().unwrap();

    // Re-running with a new listing entry leaves every existing record as-is
    let mut catalog = InMemoryCatalog::new();
    catalog.vns.push(VnEntry { id: "v7".to_string(), title: "Air".to_string() });
    catalog.characters.insert(
        "v7".to_string(),
        vec![character("c70", "Misuzu", "v7", [7, 23], &[("i1", "Kind", "Personality")])],
    );
    harvester(&catalog)
        .run(&opts(&["v2", "v10", "v7"], Some(&path), true), &mut std::io::sink())
        .await
        .unwrap();
    let second = read_store(&path).unwrap().unwrap();

    assert_eq!(catalog.calls(), vec!["v7"]);
    for ch in &first.characters {
        assert!(second.characters.contains(ch));
    }
    assert_eq!(second.characters.len(), first.characters.len() + 1);
}
