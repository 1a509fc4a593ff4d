//! Signature-trait selection.
//!
//! Every character is labeled with one representative trait. The choice is
//! driven by how common each trait is across the whole fetched roster:
//!
//! ```text
//! score(t) = (1 / frequency(t)) * group_weight(t.group)     (0 if frequency is 0)
//! ```
//!
//! Selection cascades through three tiers:
//!
//! 1. best-scoring trait shared by at least `min_overlap` characters,
//! 2. best-scoring trait among the remaining (rarer) ones,
//! 3. the first trait in the character's list.
//!
//! Only SFW traits take part anywhere: a trait whose group name contains a
//! denied substring is invisible to counting, scoring and selection. Ties
//! go to the trait listed first.
//!
//! The [`FrequencyTable`] is built once over the complete roster before
//! any character is labeled.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::models::{CharacterRecord, CharacterTrait};

/// Tunables of the scoring scheme.
#[derive(Debug, Clone)]
pub struct TraitPolicy {
    pub min_overlap: usize,
    pub denied_group_substrings: Vec<String>,
    pub group_weights: BTreeMap<String, f64>,
    pub default_weight: f64,
}

impl TraitPolicy {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            min_overlap: config.min_overlap,
            denied_group_substrings: config.denied_group_substrings.clone(),
            group_weights: config.group_weights.clone(),
            default_weight: config.default_weight,
        }
    }

    pub fn is_sfw(&self, t: &CharacterTrait) -> bool {
        !self
            .denied_group_substrings
            .iter()
            .any(|bad| t.group_name.contains(bad.as_str()))
    }

    pub fn group_weight(&self, group: &str) -> f64 {
        self.group_weights
            .get(group)
            .copied()
            .unwrap_or(self.default_weight)
    }

    fn sfw_traits<'a>(&'a self, character: &'a CharacterRecord) -> impl Iterator<Item = &'a CharacterTrait> {
        character.trait_list().iter().filter(|t| self.is_sfw(t))
    }
}

impl Default for TraitPolicy {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

/// Number of characters carrying each SFW trait id.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    counts: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn build(characters: &[CharacterRecord], policy: &TraitPolicy) -> Self {
        let mut counts = HashMap::new();
        for character in characters {
            for t in policy.sfw_traits(character) {
                *counts.entry(t.id.clone()).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn get(&self, trait_id: &str) -> usize {
        self.counts.get(trait_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

pub fn score_trait(t: &CharacterTrait, freq: &FrequencyTable, policy: &TraitPolicy) -> f64 {
    let count = freq.get(&t.id);
    let base = if count > 0 { 1.0 / count as f64 } else { 0.0 };
    base * policy.group_weight(&t.group_name)
}

/// Highest-scoring trait; the earliest wins on equal scores.
fn best_trait<'a>(
    traits: &[&'a CharacterTrait],
    freq: &FrequencyTable,
    policy: &TraitPolicy,
) -> Option<&'a CharacterTrait> {
    let mut best: Option<(&CharacterTrait, f64)> = None;
    for &t in traits {
        let score = score_trait(t, freq, policy);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((t, score)),
        }
    }
    best.map(|(t, _)| t)
}

/// Pick the signature trait of one character (tiers 1 and 2).
///
/// Returns `None` only when the character has no SFW traits.
pub fn select_signature_trait(
    character: &CharacterRecord,
    freq: &FrequencyTable,
    policy: &TraitPolicy,
) -> Option<String> {
    let (shared, leftovers): (Vec<&CharacterTrait>, Vec<&CharacterTrait>) = policy
        .sfw_traits(character)
        .partition(|t| freq.get(&t.id) >= policy.min_overlap);

    best_trait(&shared, freq, policy)
        .or_else(|| best_trait(&leftovers, freq, policy))
        .map(|t| t.name.clone())
}

/// Label every character with its signature trait.
///
/// Frequencies are computed over `characters` as a whole first.
pub fn label_records(characters: Vec<CharacterRecord>, policy: &TraitPolicy) -> Vec<CharacterRecord> {
    let freq = FrequencyTable::build(&characters, policy);
    debug!(
        characters = characters.len(),
        distinct_traits = freq.len(),
        "Built trait frequencies"
    );

    characters
        .into_iter()
        .map(|character| {
            let signature = select_signature_trait(&character, &freq, policy).or_else(|| {
                policy
                    .sfw_traits(&character)
                    .next()
                    .map(|t| t.name.clone())
            });
            CharacterRecord {
                signature_trait: Some(signature),
                ..character
            }
        })
        .collect()
}
