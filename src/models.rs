//! Core data models used throughout vn-roster.
//!
//! A [`CharacterRecord`] is a single type that covers the whole lifecycle
//! of a character: as returned by the catalog (nested `traits`, `vns`,
//! `image`), after labeling (`non_unique_trait`), and after the
//! normalization pipeline (flat `image_url`, grouped trait fields,
//! provenance fields). Fields that a stage removes are `None` and are not
//! serialized. Unknown keys are kept in `extra` so records survive a
//! read-modify-write of the store untouched.
//!
//! Keys that a stage writes even when the value is missing
//! (`non_unique_trait`, `released`, `role`) are [`Nullable`]: `None` while
//! the key is absent, `Some(None)` once it is written as `null`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Trait groups that are flattened into their own record fields.
pub const TRAIT_GROUPS: [&str; 5] = ["Hair", "Personality", "Eyes", "Role", "Body"];

/// Absent, `null`, or a value.
pub type Nullable<T> = Option<Option<T>>;

/// Deserialize a present key, `null` included, as `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A catalog entry ("VN").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A descriptive tag attached to a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterTrait {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// One VN a character appears in, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnLink {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub developers: Vec<Developer>,
}

/// Birthday as `[month, day]` from the catalog, or the `"DD.MM."` text
/// written by normalization. Any other shape is carried as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Birthday {
    Parts(Vec<u32>),
    Text(String),
    Other(Value),
}

/// Sex as the catalog's `[apparent, real]` pair, or a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sex {
    Many(Vec<Option<String>>),
    One(String),
    Other(Value),
}

/// Trait names of one group: a plain string when there is exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValue {
    One(String),
    Many(Vec<String>),
}

impl GroupValue {
    /// Build from names that are already sorted. Returns `None` for an
    /// empty list.
    pub fn from_names(mut names: Vec<String>) -> Option<Self> {
        match names.len() {
            0 => None,
            1 => names.pop().map(GroupValue::One),
            _ => Some(GroupValue::Many(names)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub birthday: Option<Birthday>,
    #[serde(default)]
    pub sex: Option<Sex>,

    /// Nested `{ "url": ... }` image descriptor (raw records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Full trait list (raw records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<CharacterTrait>>,
    /// VN associations (raw records, and records without an origin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vns: Option<Vec<VnLink>>,

    /// The VN this record was fetched for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Set by labeling; `Some(None)` when no SFW trait exists.
    #[serde(
        rename = "non_unique_trait",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub signature_trait: Nullable<String>,

    #[serde(rename = "Hair", default, skip_serializing_if = "Option::is_none")]
    pub hair: Option<GroupValue>,
    #[serde(rename = "Personality", default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<GroupValue>,
    #[serde(rename = "Eyes", default, skip_serializing_if = "Option::is_none")]
    pub eyes: Option<GroupValue>,
    #[serde(rename = "Role", default, skip_serializing_if = "Option::is_none")]
    pub role_traits: Option<GroupValue>,
    #[serde(rename = "Body", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<GroupValue>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub released: Nullable<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub role: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterRecord {
    /// The signature trait name, if labeling found one.
    pub fn signature(&self) -> Option<&str> {
        self.signature_trait.as_ref()?.as_deref()
    }

    /// The raw trait list, empty once normalization dropped it.
    pub fn trait_list(&self) -> &[CharacterTrait] {
        self.traits.as_deref().unwrap_or(&[])
    }

    /// Grouped trait field for one of [`TRAIT_GROUPS`].
    pub fn group(&self, group: &str) -> Option<&GroupValue> {
        match group {
            "Hair" => self.hair.as_ref(),
            "Personality" => self.personality.as_ref(),
            "Eyes" => self.eyes.as_ref(),
            "Role" => self.role_traits.as_ref(),
            "Body" => self.body.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn group_slot_mut(&mut self, group: &str) -> Option<&mut Option<GroupValue>> {
        match group {
            "Hair" => Some(&mut self.hair),
            "Personality" => Some(&mut self.personality),
            "Eyes" => Some(&mut self.eyes),
            "Role" => Some(&mut self.role_traits),
            "Body" => Some(&mut self.body),
            _ => None,
        }
    }
}
