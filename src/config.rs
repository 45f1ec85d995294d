use std::path::PathBuf;

use serde::Deserialize;

use crate::{expand, ingest};

#[derive(Deserialize, Clone, Debug)]
pub struct StorageConfig {
    /// sqlx connection url, e.g. `sqlite://datasets.sqlite`.
    pub url: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum ReferenceConfig {
    Static {
        path: PathBuf,
    },
    GeoApi {
        #[serde(default = "default_geo_url")]
        url: url::Url,
    },
}

#[derive(Deserialize, Clone, Debug)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: url::Url,
    #[serde(default = "default_tag")]
    pub tag: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            tag: default_tag(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ValidatorConfig {
    pub endpoint: url::Url,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub storage: StorageConfig,
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub validator: Option<ValidatorConfig>,
    /// Validations in flight during a refresh. Defaults to the CPU count.
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_geo_url() -> url::Url {
    url::Url::parse(expand::geo::DEFAULT_BASE_URL).expect("valid constant url")
}

fn default_catalog_url() -> url::Url {
    url::Url::parse(ingest::catalog::DEFAULT_API_URL).expect("valid constant url")
}

fn default_tag() -> String {
    ingest::catalog::DEFAULT_TAG.to_owned()
}

fn default_output() -> PathBuf {
    PathBuf::from("datasets.json")
}

impl Config {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(num_cpus::get)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage.url.trim().is_empty() {
            return Err("storage.url must not be empty".into());
        }
        if self.concurrency == Some(0) {
            return Err("concurrency must be at least 1".into());
        }
        if self.catalog.tag.trim().is_empty() {
            return Err("catalog.tag must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: Config = serde_yaml::from_str(
            r#"
storage:
  url: sqlite://datasets.sqlite
reference:
  type: Static
  path: communes.json
"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.catalog.tag, "base-adresse-locale");
        assert_eq!(config.output, PathBuf::from("datasets.json"));
        assert!(config.validator.is_none());
        assert!(config.concurrency() >= 1);
    }

    #[test]
    fn test_full_config() {
        let config: Config = serde_yaml::from_str(
            r#"
storage:
  url: "sqlite::memory:"
  namespace: bal
reference:
  type: GeoApi
catalog:
  url: http://localhost:8080/api/1/datasets/
  tag: bal
validator:
  endpoint: http://localhost:5000/validate
concurrency: 0
output: out/datasets.json
"#,
        )
        .unwrap();
        assert!(matches!(
            &config.reference,
            ReferenceConfig::GeoApi { url } if url.as_str() == "https://geo.api.gouv.fr/"
        ));
        assert_eq!(config.storage.namespace.as_deref(), Some("bal"));
        assert_eq!(
            config.validate(),
            Err("concurrency must be at least 1".to_owned())
        );
    }
}
