//! Persistence layer: snapshot stores and the transactional repository

pub mod json;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    circulation::{CirculationDesk, CirculationPolicy},
    error::{AppError, AppResult, StorageError},
    models::{Reader, Title},
};

pub use json::JsonFileStore;
pub use memory::MemoryStore;

/// Whole-collection load and replace of readers and titles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_readers(&self) -> Result<Vec<Reader>, StorageError>;
    async fn save_readers(&self, readers: &[Reader]) -> Result<(), StorageError>;
    async fn load_titles(&self) -> Result<Vec<Title>, StorageError>;
    async fn save_titles(&self, titles: &[Title]) -> Result<(), StorageError>;
}

/// Live circulation state backed by a store.
///
/// One lock serializes every operation. Mutations run against a copy of the
/// state, and the copy only becomes live once the store accepted it.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
    desk: Arc<Mutex<CirculationDesk>>,
}

impl Repository {
    /// Load the persisted snapshot into memory
    pub async fn load(
        store: Arc<dyn Store>,
        policy: CirculationPolicy,
    ) -> Result<Self, StorageError> {
        let readers = store.load_readers().await?;
        let titles = store.load_titles().await?;
        tracing::info!(
            readers = readers.len(),
            titles = titles.len(),
            "Loaded circulation snapshot"
        );

        Ok(Self {
            store,
            desk: Arc::new(Mutex::new(CirculationDesk::from_snapshot(
                policy, readers, titles,
            ))),
        })
    }

    /// Run a read-only query against the live state
    pub async fn read<T>(&self, query: impl FnOnce(&CirculationDesk) -> T) -> T {
        let desk = self.desk.lock().await;
        query(&desk)
    }

    /// Run a mutation, persist the result, then publish it
    pub async fn transact<T, E>(
        &self,
        operation: impl FnOnce(&mut CirculationDesk) -> Result<T, E>,
    ) -> AppResult<T>
    where
        AppError: From<E>,
    {
        let mut live = self.desk.lock().await;
        let mut next = live.clone();
        let value = operation(&mut next)?;

        let (readers, titles) = next.snapshot();
        self.store.save_readers(&readers).await?;
        self.store.save_titles(&titles).await?;

        *live = next;
        Ok(value)
    }
}
