//! Loan ledger: readers and the lifecycle of their loans

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use super::CirculationPolicy;
use crate::{
    error::CirculationError,
    models::{Loan, LoanStatus, Reader},
};

/// Re-derive `Active -> Overdue` against `now`.
///
/// Stored statuses are never trusted for a decision without passing through
/// this first.
pub fn normalize_statuses(loans: &mut [Loan], now: DateTime<Utc>) {
    for loan in loans.iter_mut() {
        if loan.status == LoanStatus::Active && now > loan.due_on {
            loan.status = LoanStatus::Overdue;
        }
    }
}

/// Readers keyed by identity, in registration order
#[derive(Debug, Clone, Default)]
pub struct LoanLedger {
    readers: IndexMap<String, Reader>,
}

impl LoanLedger {
    pub fn new(readers: impl IntoIterator<Item = Reader>) -> Self {
        Self {
            readers: readers
                .into_iter()
                .map(|reader| (reader.id.clone(), reader))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Result<&Reader, CirculationError> {
        self.readers
            .get(id)
            .ok_or_else(|| CirculationError::ReaderNotFound(id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Result<&mut Reader, CirculationError> {
        self.readers
            .get_mut(id)
            .ok_or_else(|| CirculationError::ReaderNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.readers.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reader> {
        self.readers.values()
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub(crate) fn insert(&mut self, reader: Reader) {
        self.readers.insert(reader.id.clone(), reader);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Reader> {
        self.readers.shift_remove(id)
    }

    /// Normalize a reader's loan statuses and return the reader
    pub(crate) fn normalize(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<&Reader, CirculationError> {
        let reader = self.get_mut(id)?;
        normalize_statuses(&mut reader.loans, now);
        Ok(&*reader)
    }

    /// Loan-count and debt limits, in that order. Expects normalized statuses.
    pub fn check_borrowing_limits(
        reader: &Reader,
        policy: &CirculationPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), CirculationError> {
        let open = reader.open_loan_count();
        if open >= policy.max_active_loans {
            return Err(CirculationError::LoanLimitReached {
                open,
                max: policy.max_active_loans,
            });
        }

        let owed = policy.fines().compute_total_owed(&reader.loans, now);
        if owed >= policy.max_debt {
            return Err(CirculationError::DebtLimitExceeded {
                owed,
                max: policy.max_debt,
            });
        }

        Ok(())
    }

    /// Append a fresh active loan
    pub(crate) fn open_loan(
        &mut self,
        reader_id: &str,
        title_id: i32,
        policy: &CirculationPolicy,
        now: DateTime<Utc>,
    ) -> Result<&Loan, CirculationError> {
        let reader = self.get_mut(reader_id)?;
        reader.loans.push(Loan::open(title_id, now, policy.loan_days));
        reader
            .loans
            .last()
            .ok_or(CirculationError::ActiveLoanNotFound(title_id))
    }

    /// Close the unfinished loan for a title, freezing its fee
    pub(crate) fn close_loan(
        &mut self,
        reader_id: &str,
        title_id: i32,
        policy: &CirculationPolicy,
        now: DateTime<Utc>,
    ) -> Result<&Loan, CirculationError> {
        let fines = policy.fines();
        let reader = self.get_mut(reader_id)?;
        let position = reader
            .open_loan_position(title_id)
            .ok_or(CirculationError::ActiveLoanNotFound(title_id))?;

        let loan = &mut reader.loans[position];
        let fee = fines.compute_fee(loan, now);
        loan.status = if fee > Decimal::ZERO {
            LoanStatus::ReturnedLate
        } else {
            LoanStatus::ReturnedOnTime
        };
        loan.returned_on = Some(now);
        loan.fee_owed = fee;
        Ok(&*loan)
    }

    /// Extend the unfinished loan for a title by one loan period from its
    /// current due date
    pub(crate) fn renew_loan(
        &mut self,
        reader_id: &str,
        title_id: i32,
        policy: &CirculationPolicy,
        now: DateTime<Utc>,
    ) -> Result<&Loan, CirculationError> {
        let position = self
            .get(reader_id)?
            .open_loan_position(title_id)
            .ok_or(CirculationError::ActiveLoanNotFound(title_id))?;

        let reader = self.normalize(reader_id, now)?;
        let owed = policy.fines().compute_total_owed(&reader.loans, now);
        if owed >= policy.max_debt {
            return Err(CirculationError::DebtLimitExceeded {
                owed,
                max: policy.max_debt,
            });
        }

        let days_remaining = (reader.loans[position].due_on - now).num_days();
        if days_remaining > policy.renewal_window_days {
            return Err(CirculationError::RenewalTooEarly {
                days_remaining,
                window: policy.renewal_window_days,
            });
        }

        let reader = self.get_mut(reader_id)?;
        let loan = &mut reader.loans[position];
        loan.due_on += Duration::days(policy.loan_days);
        loan.status = LoanStatus::Active;
        Ok(&*loan)
    }

    /// Zero the outstanding fee of a late return, returning what was owed
    pub(crate) fn settle_fee(
        &mut self,
        reader_id: &str,
        title_id: i32,
    ) -> Result<Decimal, CirculationError> {
        let reader = self.get_mut(reader_id)?;
        let loan = reader
            .loans
            .iter_mut()
            .find(|loan| {
                loan.title_id == title_id
                    && loan.status == LoanStatus::ReturnedLate
                    && loan.fee_owed > Decimal::ZERO
            })
            .ok_or(CirculationError::NoPendingFeeFound(title_id))?;

        Ok(std::mem::replace(&mut loan.fee_owed, Decimal::ZERO))
    }
}
