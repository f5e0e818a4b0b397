//! Remote package registry client (category metadata only).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::PackageCategory;

pub const DEFAULT_CATALOG_URL: &str = "https://thunderstore.io";
const USER_AGENT: &str = concat!("ModState/", env!("CARGO_PKG_VERSION"));

/// Source of package categories for one game.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn categories(&self, game_id: &str) -> Result<Vec<PackageCategory>>;
}

#[derive(Debug, Deserialize)]
struct FiltersResponse {
    package_categories: Vec<PackageCategory>,
}

/// Thunderstore community filters endpoint.
///
/// `GET {base}/api/cyberstorm/community/{game_id}/filters/`, no
/// authentication, no pagination.
#[derive(Debug, Clone)]
pub struct ThunderstoreCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl ThunderstoreCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn filters_url(&self, game_id: &str) -> String {
        format!(
            "{}/api/cyberstorm/community/{}/filters/",
            self.base_url, game_id
        )
    }
}

#[async_trait]
impl CategorySource for ThunderstoreCatalog {
    async fn categories(&self, game_id: &str) -> Result<Vec<PackageCategory>> {
        let url = self.filters_url(game_id);
        tracing::debug!("Fetching categories from {url}");

        let response: FiltersResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(
            "Fetched {} categories for '{game_id}'",
            response.package_categories.len()
        );
        Ok(response.package_categories)
    }
}
