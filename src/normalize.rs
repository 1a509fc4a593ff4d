//! Record normalization pipeline.
//!
//! Turns a labeled catalog record into the flat shape persisted in the
//! store. The pipeline is a fixed sequence of stages, each taking a record
//! by value and returning the next one:
//!
//! | # | Stage | Effect |
//! |---|-------|--------|
//! | 1 | [`group_traits`] | `traits` → `Hair`/`Personality`/`Eyes`/`Role`/`Body` |
//! | 2 | [`normalize_birthday`] | `[month, day]` → `"DD.MM."` |
//! | 3 | [`normalize_image`] | `image.url` → `image_url` |
//! | 4 | [`normalize_sex`] | `[apparent, real]` → `apparent` |
//! | 5 | [`cross_reference_origin`] | origin VN link → `released`, `role`, `developer` |
//!
//! Order matters: stage 5 reads `vns` and `origin`, which no earlier stage
//! touches.

use serde_json::Value;

use crate::error::{HarvestError, Result};
use crate::models::{Birthday, CharacterRecord, GroupValue, Sex, TRAIT_GROUPS};

pub type Stage = fn(CharacterRecord) -> Result<CharacterRecord>;

pub const PIPELINE: [(&str, Stage); 5] = [
    ("group_traits", group_traits),
    ("normalize_birthday", normalize_birthday),
    ("normalize_image", normalize_image),
    ("normalize_sex", normalize_sex),
    ("cross_reference_origin", cross_reference_origin),
];

/// Run every stage of [`PIPELINE`] on one record.
pub fn normalize_record(record: CharacterRecord) -> Result<CharacterRecord> {
    PIPELINE
        .iter()
        .try_fold(record, |record, (_, stage)| stage(record))
}

pub fn normalize_records(records: Vec<CharacterRecord>) -> Result<Vec<CharacterRecord>> {
    records.into_iter().map(normalize_record).collect()
}

/// Replace the trait list with one field per target group.
///
/// Names are sorted alphabetically within a group. Groups without a match
/// are left unset.
pub fn group_traits(mut record: CharacterRecord) -> Result<CharacterRecord> {
    let traits = record.traits.take().unwrap_or_default();

    for group in TRAIT_GROUPS {
        let mut names: Vec<String> = traits
            .iter()
            .filter(|t| t.group_name == group)
            .map(|t| t.name.clone())
            .collect();
        names.sort();

        if let Some(value) = GroupValue::from_names(names) {
            if let Some(slot) = record.group_slot_mut(group) {
                *slot = Some(value);
            }
        }
    }

    Ok(record)
}

/// Format `[month, day]` as `"DD.MM."`.
pub fn birthday_to_string(parts: &[u32]) -> Result<String> {
    match parts {
        [month, day] => Ok(format!("{:02}.{:02}.", day, month)),
        _ => Err(HarvestError::InvalidBirthday { len: parts.len() }),
    }
}

/// Any list must hold exactly two entries; other shapes pass through.
pub fn normalize_birthday(record: CharacterRecord) -> Result<CharacterRecord> {
    match record.birthday {
        Some(Birthday::Parts(ref parts)) => {
            let text = birthday_to_string(parts)?;
            Ok(CharacterRecord {
                birthday: Some(Birthday::Text(text)),
                ..record
            })
        }
        Some(Birthday::Other(Value::Array(ref items))) if items.len() != 2 => {
            Err(HarvestError::InvalidBirthday { len: items.len() })
        }
        _ => Ok(record),
    }
}

/// Flatten `image: { url }` into `image_url`. The nested field is dropped
/// whatever its shape.
pub fn normalize_image(mut record: CharacterRecord) -> Result<CharacterRecord> {
    let image = record.image.take();
    if let Some(url) = image
        .as_ref()
        .and_then(|img| img.as_object())
        .and_then(|img| img.get("url"))
    {
        record.image_url = url.as_str().map(str::to_string);
    }
    Ok(record)
}

/// Keep the first entry of a sex list. An empty list is left alone.
pub fn normalize_sex(record: CharacterRecord) -> Result<CharacterRecord> {
    let sex = match record.sex {
        Some(Sex::Many(ref values)) if !values.is_empty() => values[0].clone().map(Sex::One),
        Some(Sex::Other(Value::Array(ref values))) if !values.is_empty() => match &values[0] {
            Value::Null => None,
            Value::String(value) => Some(Sex::One(value.clone())),
            other => Some(Sex::Other(other.clone())),
        },
        _ => return Ok(record),
    };
    Ok(CharacterRecord { sex, ..record })
}

/// Copy release date, role and first developer of the origin VN into flat
/// fields, then drop `vns`.
///
/// A record without an origin is returned untouched, `vns` included.
pub fn cross_reference_origin(mut record: CharacterRecord) -> Result<CharacterRecord> {
    let Some(origin) = record.origin.clone() else {
        return Ok(record);
    };

    let links = record.vns.take().unwrap_or_default();
    if let Some(link) = links.into_iter().find(|link| link.id == origin) {
        record.released = Some(link.released);
        record.role = Some(link.role);
        if let Some(dev) = link.developers.into_iter().next() {
            record.developer = Some(dev.name);
        }
    }

    Ok(record)
}
