//! data.gouv.fr catalog client

use serde::Deserialize;
use tracing::{debug, info};

use crate::model::Organization;

pub const DEFAULT_API_URL: &str = "https://www.data.gouv.fr/api/1/datasets/";
pub const DEFAULT_TAG: &str = "base-adresse-locale";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Resource {
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl CatalogEntry {
    /// URL of the first CSV resource, if any.
    pub fn csv_url(&self) -> Option<&str> {
        self.resources
            .iter()
            .find(|resource| {
                resource
                    .format
                    .as_deref()
                    .is_some_and(|format| format.eq_ignore_ascii_case("csv"))
            })
            .map(|resource| resource.url.as_str())
    }
}

#[derive(Deserialize)]
struct Page {
    data: Vec<CatalogEntry>,
    #[serde(default)]
    next_page: Option<url::Url>,
}

pub struct DataGouvCatalog {
    client: reqwest::Client,
    api_url: url::Url,
    tag: String,
}

impl DataGouvCatalog {
    pub fn new(client: reqwest::Client, api_url: url::Url, tag: impl Into<String>) -> Self {
        Self {
            client,
            api_url,
            tag: tag.into(),
        }
    }

    /// Every dataset carrying the tag and at least one CSV resource.
    pub async fn fetch(&self) -> Result<Vec<CatalogEntry>, Error> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut().append_pair("tag", &self.tag);
        let mut next = Some(url);
        let mut entries = Vec::new();
        while let Some(url) = next {
            debug!(%url, "fetch catalog page");
            let page: Page = self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            entries.extend(page.data);
            next = page.next_page;
        }
        let total = entries.len();
        let entries = filter_csv(entries);
        info!(total, with_csv = entries.len(), "fetched catalog");
        Ok(entries)
    }
}

pub fn filter_csv(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.csv_url().is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_csv() {
        let page: Page = serde_json::from_str(
            r#"{
                "data": [
                    {"id": "a", "title": "A", "resources": [
                        {"url": "https://example.org/a.zip", "format": "zip"},
                        {"url": "https://example.org/a.csv", "format": "CSV"}
                    ]},
                    {"id": "b", "title": "B", "resources": [
                        {"url": "https://example.org/b.json", "format": "json"}
                    ]},
                    {"id": "c", "title": "C"}
                ],
                "next_page": null
            }"#,
        )
        .unwrap();
        let entries = filter_csv(page.data);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].csv_url(), Some("https://example.org/a.csv"));
    }
}
