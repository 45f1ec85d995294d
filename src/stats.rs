use std::collections::BTreeMap;

use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use crate::model::Dataset;

/// Bucket used for datasets that carry no value for a grouped field.
///
/// An explicit `null` lands here too, next to a missing field, instead of
/// getting a bucket of its own.
pub const UNDEFINED_BUCKET: &str = "undefined";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub count: usize,
    pub numeros_count: u64,
    pub license: BTreeMap<String, usize>,
    pub model: BTreeMap<String, usize>,
}

fn count_by<'a>(values: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, usize> {
    values
        .map(|value| value.unwrap_or(UNDEFINED_BUCKET))
        .counts()
        .into_iter()
        .map(|(key, count)| (key.to_owned(), count))
        .collect()
}

pub fn compute_stats(datasets: &[Dataset]) -> Stats {
    Stats {
        count: datasets.len(),
        numeros_count: datasets
            .iter()
            .filter_map(Dataset::numeros)
            .fold(0, u64::saturating_add),
        license: count_by(datasets.iter().map(|d| d.license.as_deref())),
        model: count_by(datasets.iter().map(|d| d.model.as_deref())),
    }
}
