use std::{
    collections::{HashMap, hash_map},
    convert::Infallible,
    path::Path,
};

use serde::Deserialize;
use tracing::{error, info};

use crate::model::CommuneReference;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read reference file: {0}")]
    Read(std::io::Error),
    #[error("failed to parse reference file: {0}")]
    Parse(serde_json::Error),
}

const CURRENT_COMMUNE: &str = "commune-actuelle";

#[derive(Deserialize)]
struct Record {
    code: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(flatten)]
    reference: CommuneReference,
}

/// Reference index held in memory, loaded from a JSON array of communes.
///
/// Delegated communes and municipal arrondissements are indexed under their
/// own codes. When one shares its code with a `commune-actuelle`, the
/// `commune-actuelle` entry is kept.
#[derive(Default, Clone)]
pub struct StaticIndex {
    communes: HashMap<String, CommuneReference>,
}

impl StaticIndex {
    pub fn new(communes: impl IntoIterator<Item = (String, CommuneReference)>) -> Self {
        Self {
            communes: communes.into_iter().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        let mut communes = HashMap::with_capacity(records.len());
        for record in records {
            let current = record
                .kind
                .as_deref()
                .is_none_or(|kind| kind == CURRENT_COMMUNE);
            match communes.entry(record.code) {
                hash_map::Entry::Vacant(slot) => {
                    slot.insert(record.reference);
                }
                hash_map::Entry::Occupied(mut slot) if current => {
                    slot.insert(record.reference);
                }
                hash_map::Entry::Occupied(_) => {}
            }
        }
        Ok(Self { communes })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .inspect_err(|error| error!(%error, path = %path.display(), "Failed to read reference file"))
            .map_err(LoadError::Read)?;
        let index = Self::from_json(&json).map_err(LoadError::Parse)?;
        info!(count = index.len(), path = %path.display(), "loaded commune reference index");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.communes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communes.is_empty()
    }
}

impl super::ReferenceIndex for StaticIndex {
    type Error = Infallible;

    async fn lookup_commune(&self, code: &str) -> Result<Option<CommuneReference>, Self::Error> {
        Ok(self.communes.get(code).cloned())
    }

    async fn lookup_communes(
        &self,
        codes: &[&str],
    ) -> Result<HashMap<String, CommuneReference>, Self::Error> {
        Ok(codes
            .iter()
            .filter_map(|code| {
                self.communes
                    .get(*code)
                    .map(|reference| ((*code).to_owned(), reference.clone()))
            })
            .collect())
    }
}
