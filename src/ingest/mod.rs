//! Catalog refresh
//!
//! Fetches the catalog, validates every dataset independently and replaces
//! the stored records. A dataset whose validation fails is recorded as
//! `malformed` and never aborts the batch.

pub mod catalog;
pub mod license;
pub mod validate;

use std::{collections::HashSet, path::Path};

use futures::{StreamExt as _, stream};
use tracing::{info, warn};

pub use catalog::{CatalogEntry, DataGouvCatalog};
pub use license::license_label;
pub use validate::{HttpValidator, Validation, Validator, check_report};

use crate::{
    expand::ReferenceIndex,
    kv,
    model::{Dataset, Organization, Status},
    store::{DatasetStore, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to encode catalog: {0}")]
    Encode(serde_json::Error),
    #[error("failed to write catalog file: {0}")]
    Write(std::io::Error),
}

fn dataset_from_entry(entry: CatalogEntry) -> Dataset {
    let license_label = entry
        .license
        .as_deref()
        .and_then(license_label)
        .map(Into::into);
    Dataset {
        url: entry.csv_url().map(Into::into),
        id: entry.id,
        title: Some(entry.title),
        license: entry.license,
        license_label,
        page: entry.page,
        organization: entry.organization.map(|organization| Organization {
            extra: Default::default(),
            ..organization
        }),
        status: Some(Status::Unknown),
        valid: Some(None),
        error: Some(None),
        ..Default::default()
    }
}

/// Validate one catalog entry. Never fails: errors end up in the dataset.
pub async fn validate_entry<V: Validator>(
    validator: &V,
    entry: CatalogEntry,
) -> (Dataset, Option<Validation>) {
    let mut dataset = dataset_from_entry(entry);
    let Some(url) = dataset.url.clone() else {
        return (dataset, None);
    };
    match validator.validate(&url).await {
        Ok(validation) => {
            dataset.status = Some(Status::Ok);
            dataset.valid = Some(Some(check_report(&validation.report)));
            dataset.numeros_count = validation
                .data
                .as_ref()
                .map(|data| data.numeros_count().into());
            dataset.model = validation.model.clone();
            (dataset, Some(validation))
        }
        Err(error) => {
            warn!(%error, id = %dataset.id, %url, "Failed to validate dataset");
            dataset.status = Some(Status::Malformed);
            dataset.error = Some(Some(error.to_string()));
            (dataset, None)
        }
    }
}

/// Validate every entry with at most `concurrency` validations in flight and
/// replace the stored catalog. The returned list keeps catalog order.
pub async fn refresh<V, K, R>(
    entries: Vec<CatalogEntry>,
    validator: &V,
    store: &DatasetStore<K, R>,
    concurrency: usize,
) -> Result<Vec<Dataset>, StoreError<K, R>>
where
    V: Validator,
    K: kv::Client,
    R: ReferenceIndex,
{
    let previous = store.get_datasets().await?.unwrap_or_default();
    info!(count = entries.len(), concurrency, "validate datasets");
    let results = stream::iter(entries)
        .map(|entry| validate_entry(validator, entry))
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut datasets = Vec::with_capacity(results.len());
    for (dataset, validation) in results {
        match validation {
            Some(Validation { report, data, .. }) => {
                store.put_report(&dataset.id, &report).await?;
                match data {
                    Some(data) => store.put_data(&dataset.id, &data).await?,
                    None => store.delete_data(&dataset.id).await?,
                }
            }
            None => store.delete_records(&dataset.id).await?,
        }
        datasets.push(dataset);
    }

    let current = datasets.iter().map(|d| d.id.as_str()).collect::<HashSet<_>>();
    let stale = previous
        .iter()
        .filter(|d| !d.id.is_empty() && !current.contains(d.id.as_str()));
    for stale in stale {
        info!(id = %stale.id, "dataset left the catalog");
        store.delete_records(&stale.id).await?;
    }

    store.put_datasets(&datasets).await?;
    let malformed = datasets
        .iter()
        .filter(|d| d.status == Some(Status::Malformed))
        .count();
    info!(count = datasets.len(), malformed, "catalog refreshed");
    Ok(datasets)
}

pub async fn write_catalog(path: impl AsRef<Path>, datasets: &[Dataset]) -> Result<(), WriteError> {
    let json = serde_json::to_vec(datasets).map_err(WriteError::Encode)?;
    tokio::fs::write(path, json).await.map_err(WriteError::Write)
}
