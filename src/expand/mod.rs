//! Read-time enrichment of communes with reference metadata
//!
//! Reference fields are never persisted with a dataset; they are joined here
//! from a [`ReferenceIndex`] every time a view is built.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{Commune, CommuneDetail, CommuneReference, CommuneSummary, Enriched};

pub mod geo;
pub mod static_index;

pub use geo::GeoApiIndex;
pub use static_index::StaticIndex;

pub trait ReferenceIndex {
    type Error: std::error::Error + Send + Sync + 'static;

    fn lookup_commune(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<CommuneReference>, Self::Error>> + Send;

    /// Unknown codes are left out of the returned map.
    fn lookup_communes(
        &self,
        codes: &[&str],
    ) -> impl Future<Output = Result<HashMap<String, CommuneReference>, Self::Error>> + Send;
}

/// Anything shaped like a commune record that can receive reference fields.
pub trait CommuneRecord {
    fn code(&self) -> &str;
    fn extra_mut(&mut self) -> &mut Map<String, Value>;
}

macro_rules! impl_commune_record {
    ($($ty:ty),*) => {
        $(impl CommuneRecord for $ty {
            fn code(&self) -> &str {
                &self.code
            }

            fn extra_mut(&mut self) -> &mut Map<String, Value> {
                &mut self.extra
            }
        })*
    };
}

impl_commune_record!(Commune, CommuneSummary, CommuneDetail);

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("commune {0} is unknown to the reference index")]
    ReferenceNotFound(String),
    #[error("reference index: {0}")]
    Index(E),
}

fn merge<C: CommuneRecord>(mut commune: C, reference: CommuneReference) -> Enriched<C> {
    // reference values replace stale copies carried by the record
    for field in CommuneReference::FIELDS {
        commune.extra_mut().remove(*field);
    }
    Enriched { commune, reference }
}

pub async fn expand_commune<I, C>(index: &I, commune: C) -> Result<Enriched<C>, Error<I::Error>>
where
    I: ReferenceIndex,
    C: CommuneRecord,
{
    let reference = index
        .lookup_commune(commune.code())
        .await
        .map_err(Error::Index)?
        .ok_or_else(|| Error::ReferenceNotFound(commune.code().to_owned()))?;
    Ok(merge(commune, reference))
}

/// Expands every commune with a single batched lookup. Output order follows
/// input order.
pub async fn expand_communes<I, C>(
    index: &I,
    communes: Vec<C>,
) -> Result<Vec<Enriched<C>>, Error<I::Error>>
where
    I: ReferenceIndex,
    C: CommuneRecord,
{
    if communes.is_empty() {
        return Ok(Vec::new());
    }
    let references = {
        let codes = communes.iter().map(|c| c.code()).collect::<Vec<_>>();
        debug!(count = codes.len(), "lookup communes");
        index.lookup_communes(&codes).await.map_err(Error::Index)?
    };
    communes
        .into_iter()
        .map(|commune| match references.get(commune.code()).cloned() {
            Some(reference) => Ok(merge(commune, reference)),
            None => Err(Error::ReferenceNotFound(commune.code().to_owned())),
        })
        .collect()
}
