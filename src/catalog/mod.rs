//! Client for the mod catalog API.
//!
//! The catalog pages a mod's version history oldest-listed-last: the final
//! entry of the final page is the mod's current release. That ordering is an
//! upstream contract and is followed literally here.

use crate::config::HostConfig;
use crate::fetch::{CacheDuration, FetchCache};
use crate::models::ModPackage;
use crate::utils::slug::slugify;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Responses arrive either bare or wrapped in a `data` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped {
        data: T,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped {
                data,
            }
            | Self::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModSummary {
    pub id: serde_json::Value,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModVersion {
    pub version: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct VersionPage {
    #[serde(default)]
    pub data: Vec<ModVersion>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub last_page: Option<u32>,
}

pub struct ModCatalog {
    fetch: Arc<FetchCache>,
    base_url: String,
    max_retries: u32,
}

impl ModCatalog {
    #[must_use]
    pub fn new(fetch: Arc<FetchCache>, config: &HostConfig) -> Self {
        Self {
            fetch,
            base_url: config.mods.catalog_url.trim_end_matches('/').to_string(),
            max_retries: config.fetch.max_retries,
        }
    }

    /// Resolve a catalog id into a downloadable package.
    ///
    /// `None` when the catalog is unreachable, the mod is unknown, it has no
    /// versions, or its name yields no usable slug.
    pub async fn resolve(&self, mod_id: &str) -> Option<ModPackage> {
        let summary: ModSummary = self.get_json(&format!("{}/mods/{mod_id}", self.base_url)).await?;

        let current = self.current_version(mod_id).await?;
        let install_slug = match slugify(&summary.name) {
            Ok(slug) => slug,
            Err(e) => {
                warn!(mod_id, "Cannot install catalog entry: {}", e);
                return None;
            }
        };

        Some(ModPackage {
            id: match summary.id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            },
            name: summary.name,
            version: current.version,
            download_url: current.link,
            install_slug,
        })
    }

    /// Last entry of the last page of the version history.
    pub async fn current_version(&self, mod_id: &str) -> Option<ModVersion> {
        let first_url = self.versions_url(mod_id, 1);
        let first: VersionPage = self.get_json_raw(&first_url).await?;

        let page = match first.meta.last_page {
            Some(last) if last > 1 => {
                debug!(mod_id, last, "Fetching last version page");
                self.get_json_raw(&self.versions_url(mod_id, last)).await?
            }
            _ => first,
        };

        page.data.last().cloned()
    }

    fn versions_url(&self, mod_id: &str, page: u32) -> String {
        format!("{}/mods/{mod_id}/versions?page={page}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        self.get_json_raw::<Envelope<T>>(url).await.map(Envelope::into_inner)
    }

    async fn get_json_raw<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let body = self.fetch.fetch(url, self.max_retries, CacheDuration::Short).await?;
        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(url, "Unexpected catalog response: {}", e);
                None
            }
        }
    }
}
