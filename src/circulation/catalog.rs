//! Catalog store: titles and their on-loan counters

use indexmap::IndexMap;

use crate::{error::CirculationError, models::Title};

/// Titles keyed by id, in catalog order
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    titles: IndexMap<i32, Title>,
}

impl CatalogStore {
    pub fn new(titles: impl IntoIterator<Item = Title>) -> Self {
        Self {
            titles: titles.into_iter().map(|title| (title.id, title)).collect(),
        }
    }

    pub fn get(&self, id: i32) -> Result<&Title, CirculationError> {
        self.titles.get(&id).ok_or(CirculationError::TitleNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: i32) -> Result<&mut Title, CirculationError> {
        self.titles
            .get_mut(&id)
            .ok_or(CirculationError::TitleNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Title> {
        self.titles.values()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn available_copies(&self, id: i32) -> Result<u32, CirculationError> {
        self.get(id).map(Title::available_copies)
    }

    /// Take one copy off the shelf
    pub(crate) fn check_out(&mut self, id: i32) -> Result<(), CirculationError> {
        let title = self.get_mut(id)?;
        if title.available_copies() == 0 {
            return Err(CirculationError::NoCopiesAvailable(id));
        }
        title.on_loan_count += 1;
        Ok(())
    }

    /// Put one copy back on the shelf; the counter never goes below zero
    pub(crate) fn check_in(&mut self, id: i32) -> Result<(), CirculationError> {
        let title = self.get_mut(id)?;
        title.on_loan_count = title.on_loan_count.saturating_sub(1);
        Ok(())
    }

    /// Next sequential id
    pub fn next_id(&self) -> i32 {
        self.titles.keys().max().map_or(1, |max| max + 1)
    }

    pub(crate) fn insert(&mut self, title: Title) {
        self.titles.insert(title.id, title);
    }

    pub(crate) fn remove(&mut self, id: i32) -> Option<Title> {
        self.titles.shift_remove(&id)
    }
}
