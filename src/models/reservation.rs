//! Reservation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A queued claim on a title with no copies available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub reader_id: String,
    pub reader_name: String,
    pub reserved_on: DateTime<Utc>,
}
