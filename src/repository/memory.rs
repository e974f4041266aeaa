//! In-memory store, for tests and throwaway runs

use async_trait::async_trait;
use parking_lot::RwLock;

use super::Store;
use crate::{
    error::StorageError,
    models::{Reader, Title},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    readers: RwLock<Vec<Reader>>,
    titles: RwLock<Vec<Title>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(readers: Vec<Reader>, titles: Vec<Title>) -> Self {
        Self {
            readers: RwLock::new(readers),
            titles: RwLock::new(titles),
        }
    }

    /// Last saved readers
    pub fn readers(&self) -> Vec<Reader> {
        self.readers.read().clone()
    }

    /// Last saved titles
    pub fn titles(&self) -> Vec<Title> {
        self.titles.read().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_readers(&self) -> Result<Vec<Reader>, StorageError> {
        Ok(self.readers())
    }

    async fn save_readers(&self, readers: &[Reader]) -> Result<(), StorageError> {
        *self.readers.write() = readers.to_vec();
        Ok(())
    }

    async fn load_titles(&self) -> Result<Vec<Title>, StorageError> {
        Ok(self.titles())
    }

    async fn save_titles(&self, titles: &[Title]) -> Result<(), StorageError> {
        *self.titles.write() = titles.to_vec();
        Ok(())
    }
}
