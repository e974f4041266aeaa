//! Overdue fine computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::Loan;

/// Whole days elapsed past the due date, floored; zero until then
pub fn days_late(due_on: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    if now <= due_on {
        0
    } else {
        (now - due_on).num_days()
    }
}

/// Flat per-day fine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinePolicy {
    pub daily_rate: Decimal,
}

impl FinePolicy {
    pub fn new(daily_rate: Decimal) -> Self {
        Self { daily_rate }
    }

    /// Fee accrued by a loan at `now`
    pub fn compute_fee(&self, loan: &Loan, now: DateTime<Utc>) -> Decimal {
        Decimal::from(days_late(loan.due_on, now)) * self.daily_rate
    }

    /// Sum of accrued fees over unfinished loans.
    ///
    /// Closed loans keep their frozen `fee_owed` and are not counted here.
    pub fn compute_total_owed(&self, loans: &[Loan], now: DateTime<Utc>) -> Decimal {
        loans
            .iter()
            .filter(|loan| loan.is_open())
            .map(|loan| self.compute_fee(loan, now))
            .sum()
    }
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self::new(Decimal::ONE)
    }
}
