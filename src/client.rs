//! HTTP client for the VNDB "Kana" API.
//!
//! Both resources are queried with `POST <base>/<resource>` and a JSON body
//! holding a filter expression, a comma-separated field selector and a page
//! number. Every response carries `results` and a `more` flag; the client
//! keeps requesting pages until `more` is false and returns the
//! concatenation.
//!
//! # Failure
//!
//! Transport errors and non-2xx statuses are returned as
//! [`HarvestError::Transport`] without retrying. A body that does not
//! decode is [`HarvestError::Json`], which is never retried. Retry and
//! pacing live in [`crate::fetch`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{HarvestError, Result};
use crate::ids::canonical_vn_id;
use crate::models::{CharacterRecord, VnEntry};
use crate::traits::{CatalogClient, VnListQuery};

/// Fields requested for every character.
pub const CHARACTER_FIELDS: [&str; 11] = [
    "id",
    "birthday",
    "sex",
    "age",
    "name",
    "image.url",
    "traits.name",
    "traits.group_name",
    "vns.role",
    "vns.developers.name",
    "vns.released",
];

const VN_FIELDS: &str = "id,title";

/// One page of results.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    more: bool,
}

pub struct VndbClient {
    http: reqwest::Client,
    base_url: String,
}

impl VndbClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_page<T: DeserializeOwned>(&self, resource: &str, body: &Value) -> Result<Page<T>> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl CatalogClient for VndbClient {
    async fn characters_by_vn(&self, vn_id: &str) -> Result<Vec<CharacterRecord>> {
        let vn_id = canonical_vn_id(vn_id);
        let mut characters = Vec::new();
        let mut page = 1;

        loop {
            let body = character_query(&vn_id, page);
            let batch: Page<CharacterRecord> = self.post_page("character", &body).await?;
            characters.extend(batch.results);
            if !batch.more {
                break;
            }
            page += 1;
        }

        Ok(characters)
    }

    async fn vn_by_id(&self, vn_id: &str) -> Result<Option<VnEntry>> {
        let body = vn_lookup_query(&canonical_vn_id(vn_id));
        let page: Page<VnEntry> = self.post_page("vn", &body).await?;
        Ok(page.results.into_iter().next())
    }

    async fn list_vns(&self, query: &VnListQuery) -> Result<Vec<VnEntry>> {
        if query.pages < 1 {
            return Err(HarvestError::InvalidRequest(
                "page count must be at least 1".to_string(),
            ));
        }

        let last_page = query.start.checked_add(query.pages - 1).ok_or_else(|| {
            HarvestError::InvalidRequest(format!(
                "{} pages from page {} exceed the page range",
                query.pages, query.start
            ))
        })?;

        let mut vns = Vec::new();
        let mut page = query.start;

        loop {
            let body = vn_list_query(query, page);
            let batch: Page<VnEntry> = self.post_page("vn", &body).await?;
            vns.extend(batch.results);
            if !batch.more || page == last_page {
                break;
            }
            page += 1;
        }

        Ok(vns)
    }
}

/// Request body for one page of main/primary characters of `vn_id`.
pub(crate) fn character_query(vn_id: &str, page: u32) -> Value {
    json!({
        "filters": [
            "and",
            ["vn", "=", ["id", "=", vn_id]],
            ["or", ["role", "=", "main"], ["role", "=", "primary"]]
        ],
        "fields": CHARACTER_FIELDS.join(","),
        "page": page,
    })
}

pub(crate) fn vn_lookup_query(vn_id: &str) -> Value {
    json!({
        "filters": ["id", "=", vn_id],
        "fields": VN_FIELDS,
    })
}

pub(crate) fn vn_list_query(query: &VnListQuery, page: u32) -> Value {
    json!({
        "filters": [],
        "fields": VN_FIELDS,
        "page": page,
        "reverse": query.reverse,
        "sort": query.sort,
    })
}
