//! CSV validation collaborator
//!
//! Validation itself happens outside this crate. A [`Validator`] hands back
//! the raw report together with the normalized tree extracted from the file.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{DatasetData, Report};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Validation {
    pub report: Report,
    #[serde(default)]
    pub data: Option<DatasetData>,
    /// Data model the file was recognized as.
    #[serde(default)]
    pub model: Option<String>,
}

pub trait Validator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn validate(&self, csv_url: &str)
    -> impl Future<Output = Result<Validation, Self::Error>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Posts the CSV URL to a validation service and decodes its answer.
pub struct HttpValidator {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpValidator {
    pub fn new(client: reqwest::Client, endpoint: url::Url) -> Self {
        Self { client, endpoint }
    }
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    url: &'a str,
}

impl Validator for HttpValidator {
    type Error = Error;

    async fn validate(&self, csv_url: &str) -> Result<Validation, Self::Error> {
        debug!(csv_url, endpoint = %self.endpoint, "validate");
        let validation = self
            .client
            .post(self.endpoint.clone())
            .json(&ValidateRequest { url: csv_url })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(validation)
    }
}

/// Whether a report describes a usable file: an explicit `isValid` flag
/// wins, otherwise the `errors` list must be present and empty.
pub fn check_report(report: &Report) -> bool {
    if let Some(valid) = report.get("isValid").and_then(|v| v.as_bool()) {
        return valid;
    }
    report
        .get("errors")
        .and_then(|errors| errors.as_array())
        .is_some_and(|errors| errors.is_empty())
}
