//! JSON file store: one document per collection under a data directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use super::Store;
use crate::{
    error::StorageError,
    models::{Reader, Title},
};

const READERS_FILE: &str = "readers.json";
const TITLES_FILE: &str = "titles.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store, creating the data directory if needed
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).await?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StorageError> {
        let path = self.data_dir.join(file);
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No snapshot file, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file and rename it over the target
    async fn save<T: Serialize>(&self, file: &str, records: &[T]) -> Result<(), StorageError> {
        let path = self.data_dir.join(file);
        let staging = self.data_dir.join(format!("{}.tmp", file));

        let bytes = serde_json::to_vec_pretty(records)?;
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load_readers(&self) -> Result<Vec<Reader>, StorageError> {
        self.load(READERS_FILE).await
    }

    async fn save_readers(&self, readers: &[Reader]) -> Result<(), StorageError> {
        self.save(READERS_FILE, readers).await
    }

    async fn load_titles(&self) -> Result<Vec<Title>, StorageError> {
        self.load(TITLES_FILE).await
    }

    async fn save_titles(&self, titles: &[Title]) -> Result<(), StorageError> {
        self.save(TITLES_FILE, titles).await
    }
}
