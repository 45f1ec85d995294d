//! Dataset store
//!
//! Every dataset is persisted as three independent records in a key-value
//! backend:
//!
//! - `datasets`: the catalog list
//! - `<id>-report`: the raw validation report
//! - `<id>-data`: the whole normalized address tree
//!
//! Views are assembled on each read and never written back.

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    expand::{self, ReferenceIndex, expand_commune, expand_communes},
    kv,
    model::{CommuneView, Dataset, DatasetData, Report, SummaryView, VoieView},
};

pub const DATASETS_KEY: &str = "datasets";

pub fn report_key(dataset_id: &str) -> String {
    format!("{dataset_id}-report")
}

pub fn data_key(dataset_id: &str) -> String {
    format!("{dataset_id}-data")
}

/// Which level of the tree is missing.
///
/// `Dataset` means the data record itself is absent; the other variants
/// mean the record exists but does not contain the requested entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("no data stored for dataset {0}")]
    Dataset(String),
    #[error("commune {commune} not found in dataset {dataset}")]
    Commune { dataset: String, commune: String },
    #[error("voie {voie} not found in commune {commune} of dataset {dataset}")]
    Voie {
        dataset: String,
        commune: String,
        voie: String,
    },
}

impl NotFound {
    pub fn is_missing_record(&self) -> bool {
        matches!(self, Self::Dataset(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error<KE, RE> {
    #[error("{0}")]
    NotFound(#[from] NotFound),
    #[error("commune {0} is unknown to the reference index")]
    ReferenceNotFound(String),
    #[error("kv: {0}")]
    Kv(KE),
    #[error("reference index: {0}")]
    Reference(RE),
    #[error("failed to decode record {key}: {error}")]
    Decode {
        key: String,
        error: serde_json::Error,
    },
    #[error("failed to encode record {key}: {error}")]
    Encode {
        key: String,
        error: serde_json::Error,
    },
}

impl<KE, RE> Error<KE, RE> {
    pub fn not_found(&self) -> Option<&NotFound> {
        match self {
            Self::NotFound(not_found) => Some(not_found),
            _ => None,
        }
    }
}

impl<KE, RE> From<expand::Error<RE>> for Error<KE, RE> {
    fn from(error: expand::Error<RE>) -> Self {
        match error {
            expand::Error::ReferenceNotFound(code) => Self::ReferenceNotFound(code),
            expand::Error::Index(error) => Self::Reference(error),
        }
    }
}

pub type StoreError<K, R> =
    Error<<K as kv::Client>::Error, <R as ReferenceIndex>::Error>;

/// Handle on the persisted catalog. Holds no cache: every call reads the
/// backend again.
pub struct DatasetStore<K, R> {
    kv: K,
    reference: R,
}

impl<K: kv::Client, R: ReferenceIndex> DatasetStore<K, R> {
    pub fn new(kv: K, reference: R) -> Self {
        Self { kv, reference }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub async fn close(self) {
        self.kv.close().await;
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError<K, R>> {
        let Some(value) = self.kv.get(key).await.map_err(Error::Kv)? else {
            debug!(key, "record absent");
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .inspect_err(|error| warn!(%error, key, "Failed to decode record"))
            .map_err(|error| Error::Decode {
                key: key.to_owned(),
                error,
            })
    }

    async fn write<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError<K, R>> {
        let value = serde_json::to_value(record).map_err(|error| Error::Encode {
            key: key.to_owned(),
            error,
        })?;
        self.kv.set(key, value).await.map_err(Error::Kv)?;
        debug!(key, "record written");
        Ok(())
    }

    pub async fn get_datasets(&self) -> Result<Option<Vec<Dataset>>, StoreError<K, R>> {
        self.read(DATASETS_KEY).await
    }

    pub async fn get_report(&self, dataset_id: &str) -> Result<Option<Report>, StoreError<K, R>> {
        self.read(&report_key(dataset_id)).await
    }

    pub async fn get_data(
        &self,
        dataset_id: &str,
    ) -> Result<Option<DatasetData>, StoreError<K, R>> {
        self.read(&data_key(dataset_id)).await
    }

    async fn require_data(&self, dataset_id: &str) -> Result<DatasetData, StoreError<K, R>> {
        self.get_data(dataset_id)
            .await?
            .ok_or_else(|| NotFound::Dataset(dataset_id.to_owned()).into())
    }

    /// Every commune of the dataset, without voies, enriched and ordered by
    /// code.
    pub async fn get_summary(&self, dataset_id: &str) -> Result<SummaryView, StoreError<K, R>> {
        let data = self.require_data(dataset_id).await?;
        let communes = data
            .communes
            .into_values()
            .map(|commune| commune.into_summary())
            .collect();
        Ok(SummaryView {
            communes: expand_communes(&self.reference, communes).await?,
            extra: data.extra,
        })
    }

    /// One enriched commune with its voies ordered by code, without numeros.
    pub async fn get_commune(
        &self,
        dataset_id: &str,
        commune_code: &str,
    ) -> Result<CommuneView, StoreError<K, R>> {
        let mut data = self.require_data(dataset_id).await?;
        let commune = data
            .communes
            .remove(commune_code)
            .ok_or_else(|| NotFound::Commune {
                dataset: dataset_id.to_owned(),
                commune: commune_code.to_owned(),
            })?;
        let commune = expand_commune(&self.reference, commune).await?;
        Ok(commune.map(|commune| commune.into_detail()))
    }

    /// One voie with its numeros sorted. A voie without a `numeros` field is
    /// returned without one.
    pub async fn get_voie(
        &self,
        dataset_id: &str,
        commune_code: &str,
        voie_code: &str,
    ) -> Result<VoieView, StoreError<K, R>> {
        let mut data = self.require_data(dataset_id).await?;
        let mut commune =
            data.communes
                .remove(commune_code)
                .ok_or_else(|| NotFound::Commune {
                    dataset: dataset_id.to_owned(),
                    commune: commune_code.to_owned(),
                })?;
        let voie = commune
            .voies
            .remove(voie_code)
            .ok_or_else(|| NotFound::Voie {
                dataset: dataset_id.to_owned(),
                commune: commune_code.to_owned(),
                voie: voie_code.to_owned(),
            })?;
        Ok(voie.into_view())
    }

    pub async fn put_datasets(&self, datasets: &[Dataset]) -> Result<(), StoreError<K, R>> {
        self.write(DATASETS_KEY, &datasets).await
    }

    pub async fn put_report(
        &self,
        dataset_id: &str,
        report: &Report,
    ) -> Result<(), StoreError<K, R>> {
        self.write(&report_key(dataset_id), report).await
    }

    pub async fn put_data(
        &self,
        dataset_id: &str,
        data: &DatasetData,
    ) -> Result<(), StoreError<K, R>> {
        self.write(&data_key(dataset_id), data).await
    }

    pub async fn delete_data(&self, dataset_id: &str) -> Result<(), StoreError<K, R>> {
        self.kv
            .delete(&data_key(dataset_id))
            .await
            .map_err(Error::Kv)
    }

    /// Drop the report and data records of a dataset.
    pub async fn delete_records(&self, dataset_id: &str) -> Result<(), StoreError<K, R>> {
        self.kv
            .delete(&report_key(dataset_id))
            .await
            .map_err(Error::Kv)?;
        self.delete_data(dataset_id).await
    }
}
