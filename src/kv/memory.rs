use std::{collections::HashMap, convert::Infallible};

#[derive(Default)]
pub struct MemoryClient {
    map: tokio::sync::Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Default::default()
    }
}

impl super::Client for MemoryClient {
    type Error = Infallible;

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Self::Error> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), Self::Error> {
        self.map.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Self::Error> {
        self.map.lock().await.remove(key);
        Ok(())
    }

    async fn close(&self) {}
}
