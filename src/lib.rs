pub mod config;
pub mod expand;
pub mod ingest;
pub mod kv;
pub mod model;
pub mod sort;
pub mod stats;
pub mod store;

#[cfg(test)]
mod tests;

pub use expand::{ReferenceIndex, expand_commune, expand_communes};
pub use sort::sort_by_numero;
pub use stats::{Stats, compute_stats};
pub use store::{DatasetStore, NotFound};
