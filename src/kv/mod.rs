//! Key-value backends
//!
//! The dataset store only needs whole-record reads and writes keyed by string.
//! Absence of a key is a value (`None`), never an error.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryClient;
pub use sqlite::SqliteClient;

pub trait Client {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, Self::Error>> + Send;

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Release the underlying connection. Further calls may fail.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
