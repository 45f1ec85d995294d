
use crate::{
    DatasetStore,
    expand::StaticIndex,
    kv::SqliteClient,
    model::DatasetData,
};

pub(crate) fn reference_index() -> StaticIndex {
    StaticIndex::from_json(include_str!("fixtures/communes.json")).unwrap()
}

pub(crate) fn dataset_data() -> DatasetData {
    serde_json::from_str(include_str!("fixtures/data.json")).unwrap()
}

pub(crate) async fn open_store() -> DatasetStore<SqliteClient, StaticIndex> {
    let kv = SqliteClient::open("sqlite::memory:", None).await.unwrap();
    DatasetStore::new(kv, reference_index())
}
