//! Lending, reservation and fine rules.
//!
//! The components here are synchronous and take the current instant as an
//! argument. [`desk::CirculationDesk`] composes them; the async service layer
//! owns locking, the clock and persistence.

pub mod catalog;
pub mod clock;
pub mod desk;
pub mod fines;
pub mod ledger;
pub mod queue;

use rust_decimal::Decimal;
use serde::Deserialize;

pub use clock::{Clock, ManualClock, SystemClock};
pub use desk::CirculationDesk;
pub use fines::FinePolicy;

/// Borrowing limits and loan terms
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CirculationPolicy {
    /// Length of a loan period, also used for each renewal
    pub loan_days: i64,
    /// Fine per whole day late
    pub daily_fine: Decimal,
    /// Unfinished loans a reader may hold at once
    pub max_active_loans: usize,
    /// Owed total at which borrowing and renewing stop
    pub max_debt: Decimal,
    /// Renewal opens this many days before the due date
    pub renewal_window_days: i64,
}

impl CirculationPolicy {
    pub fn fines(&self) -> FinePolicy {
        FinePolicy::new(self.daily_fine)
    }
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            loan_days: 14,
            daily_fine: Decimal::ONE,
            max_active_loans: 3,
            max_debt: Decimal::TEN,
            renewal_window_days: 5,
        }
    }
}
