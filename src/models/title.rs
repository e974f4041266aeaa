//! Title (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::reservation::Reservation;

/// Catalog title as persisted.
///
/// Copies are fungible: only the total and the number currently lent are
/// tracked. The reservation queue is embedded for persistence only; at runtime
/// it is owned by [`crate::circulation::queue::ReservationQueue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Title {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub edition: String,
    pub isbn: Option<String>,
    pub categories: Vec<String>,
    pub year: Option<i32>,
    /// Shelf location
    pub location: String,
    pub total_copies: u32,
    pub on_loan_count: u32,
    pub reservation_queue: Vec<Reservation>,
}

impl Title {
    pub fn available_copies(&self) -> u32 {
        self.total_copies.saturating_sub(self.on_loan_count)
    }
}

/// Title as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TitleDetails {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub edition: String,
    pub isbn: Option<String>,
    pub categories: Vec<String>,
    pub year: Option<i32>,
    pub location: String,
    pub total_copies: u32,
    pub on_loan_count: u32,
    pub available_copies: u32,
    /// Number of readers waiting for a copy
    pub queue_length: usize,
}

impl TitleDetails {
    pub fn new(title: &Title, queue_length: usize) -> Self {
        Self {
            id: title.id,
            title: title.title.clone(),
            author: title.author.clone(),
            publisher: title.publisher.clone(),
            edition: title.edition.clone(),
            isbn: title.isbn.clone(),
            categories: title.categories.clone(),
            year: title.year,
            location: title.location.clone(),
            total_copies: title.total_copies,
            on_loan_count: title.on_loan_count,
            available_copies: title.available_copies(),
            queue_length,
        }
    }
}

/// Create title request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTitle {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "Publisher is required"))]
    pub publisher: String,
    #[validate(length(min = 1, message = "Edition is required"))]
    pub edition: String,
    pub isbn: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub year: Option<i32>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[validate(range(min = 1, message = "At least one copy is required"))]
    pub total_copies: u32,
}

/// Update title request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTitle {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub edition: Option<String>,
    pub isbn: Option<String>,
    pub categories: Option<Vec<String>>,
    pub year: Option<i32>,
    pub location: Option<String>,
    pub total_copies: Option<u32>,
}
