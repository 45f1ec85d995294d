//! Reference index backed by the geo.api.gouv.fr communes endpoint

use std::collections::HashMap;

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::model::CommuneReference;

pub const DEFAULT_BASE_URL: &str = "https://geo.api.gouv.fr/";

const FIELDS: &str = "nom,code,population,codeDepartement,codeRegion,codesPostaux";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("base url cannot hold a path: {0}")]
    InvalidBase(url::Url),
}

pub struct GeoApiIndex {
    client: reqwest::Client,
    base: url::Url,
}

impl GeoApiIndex {
    pub fn new(client: reqwest::Client, base: url::Url) -> Self {
        Self { client, base }
    }

    fn commune_url(&self, code: &str) -> Result<url::Url, Error> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidBase(self.base.clone()))?
            .pop_if_empty()
            .extend(["communes", code]);
        Ok(url)
    }
}

impl super::ReferenceIndex for GeoApiIndex {
    type Error = Error;

    async fn lookup_commune(&self, code: &str) -> Result<Option<CommuneReference>, Self::Error> {
        let url = self.commune_url(code)?;
        debug!(%url, "lookup commune");
        let response = self
            .client
            .get(url)
            .query(&[("fields", FIELDS)])
            .send()
            .await
            .map_err(Error::Transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(code, "commune unknown to geo api");
            return Ok(None);
        }
        let reference = response
            .error_for_status()
            .map_err(Error::Transport)?
            .json::<CommuneReference>()
            .await
            .map_err(Error::Transport)?;
        Ok(Some(reference))
    }

    // the API has no multi-code endpoint, so the batch is issued concurrently
    async fn lookup_communes(
        &self,
        codes: &[&str],
    ) -> Result<HashMap<String, CommuneReference>, Self::Error> {
        let found = try_join_all(codes.iter().map(|code| async move {
            let reference = self.lookup_commune(code).await?;
            Ok::<_, Error>(reference.map(|reference| ((*code).to_owned(), reference)))
        }))
        .await?;
        Ok(found.into_iter().flatten().collect())
    }
}
