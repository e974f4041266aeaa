//! Circulation Desk
//!
//! Library lending server: loans with due dates and overdue fines, a FIFO
//! reservation queue per title that hands returned copies to the next
//! eligible reader, and a REST JSON API over it.

use std::sync::Arc;

pub mod api;
pub mod circulation;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
