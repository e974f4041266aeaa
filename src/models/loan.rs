//! Loan model and related types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Loan status.
///
/// `Overdue` is derived from the due date at decision time, see
/// [`crate::circulation::ledger::normalize_statuses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Overdue,
    ReturnedOnTime,
    ReturnedLate,
}

impl LoanStatus {
    /// Whether the copy is still out with the reader
    pub fn is_open(self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::ReturnedOnTime => "returned_on_time",
            LoanStatus::ReturnedLate => "returned_late",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reader's borrowing record for one title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub title_id: i32,
    pub borrowed_on: DateTime<Utc>,
    pub due_on: DateTime<Utc>,
    pub status: LoanStatus,
    pub returned_on: Option<DateTime<Utc>>,
    /// Fee frozen at return time; zeroed once settled
    #[schema(value_type = String)]
    pub fee_owed: Decimal,
}

impl Loan {
    /// Open a fresh loan starting at `now`
    pub fn open(title_id: i32, now: DateTime<Utc>, loan_days: i64) -> Self {
        Self {
            title_id,
            borrowed_on: now,
            due_on: now + Duration::days(loan_days),
            status: LoanStatus::Active,
            returned_on: None,
            fee_owed: Decimal::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
