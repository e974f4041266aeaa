//! The circulation desk: catalog, ledger and reservation queue as one unit

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::{
    catalog::CatalogStore,
    ledger::{normalize_statuses, LoanLedger},
    queue::{HeadDecision, HeadOutcome, ReservationQueue},
    CirculationPolicy,
};
use crate::{
    error::{AppError, AppResult, CirculationError},
    models::{
        title::{CreateTitle, UpdateTitle},
        Actor, Loan, LoanStatus, Reader, Reservation, Title, TitleDetails,
    },
};

/// Outcome of a borrow, self-service or staff-initiated
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LoanReceipt {
    pub reader_id: String,
    pub reader_name: String,
    pub title_id: i32,
    pub title: String,
    pub due_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReservationReceipt {
    pub reader_id: String,
    pub title_id: i32,
    pub title: String,
    /// 1-based position in the title's queue
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CancellationReceipt {
    pub reader_id: String,
    pub title_id: i32,
    pub title: String,
}

/// Loan created for the next queued reader when a copy comes back
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AutoAssignment {
    pub reader_id: String,
    pub reader_name: String,
    pub due_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub reader_id: String,
    pub reader_name: String,
    pub title_id: i32,
    pub title: String,
    pub status: LoanStatus,
    #[schema(value_type = String)]
    pub fee: Decimal,
    pub auto_assigned: Option<AutoAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SettlementReceipt {
    pub reader_id: String,
    pub reader_name: String,
    pub title_id: i32,
    pub title: String,
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RenewalReceipt {
    pub reader_id: String,
    pub reader_name: String,
    pub title_id: i32,
    pub title: String,
    pub due_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatementLine {
    pub title_id: i32,
    pub borrowed_on: DateTime<Utc>,
    pub due_on: DateTime<Utc>,
    pub status: LoanStatus,
    #[schema(value_type = String)]
    pub accrued_fee: Decimal,
}

/// What a reader owes right now
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AccountStatement {
    pub reader_id: String,
    pub reader_name: String,
    /// Accrued fees on unfinished loans; this is what the borrowing limit sees
    #[schema(value_type = String)]
    pub open_debt: Decimal,
    /// Fees frozen on late returns and not yet settled
    #[schema(value_type = String)]
    pub unsettled_fees: Decimal,
    pub open_loans: Vec<StatementLine>,
}

/// Combined circulation state.
///
/// Every operation validates before it mutates, so an `Err` leaves the desk
/// as it was (apart from status normalization, which is idempotent).
#[derive(Debug, Clone, Default)]
pub struct CirculationDesk {
    policy: CirculationPolicy,
    catalog: CatalogStore,
    ledger: LoanLedger,
    queue: ReservationQueue,
}

impl CirculationDesk {
    pub fn new(policy: CirculationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build the desk from persisted collections
    pub fn from_snapshot(
        policy: CirculationPolicy,
        readers: Vec<Reader>,
        mut titles: Vec<Title>,
    ) -> Self {
        let mut queue = ReservationQueue::new();
        for title in titles.iter_mut() {
            queue.load(title.id, std::mem::take(&mut title.reservation_queue));
        }
        let catalog = CatalogStore::new(titles);

        Self {
            policy,
            catalog,
            ledger: LoanLedger::new(readers),
            queue,
        }
    }

    /// Collections to persist, with each title's queue embedded
    pub fn snapshot(&self) -> (Vec<Reader>, Vec<Title>) {
        let readers = self.ledger.iter().cloned().collect();
        let titles = self
            .catalog
            .iter()
            .map(|title| Title {
                reservation_queue: self.queue.entries(title.id),
                ..title.clone()
            })
            .collect();
        (readers, titles)
    }

    pub fn policy(&self) -> &CirculationPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn ledger(&self) -> &LoanLedger {
        &self.ledger
    }

    pub fn queue(&self) -> &ReservationQueue {
        &self.queue
    }

    pub fn title_details(&self, title_id: i32) -> Result<TitleDetails, CirculationError> {
        let title = self.catalog.get(title_id)?;
        Ok(TitleDetails::new(title, self.queue.len(title_id)))
    }

    // ------------------------------------------------------------------
    // Circulation
    // ------------------------------------------------------------------

    /// Staff lends a title on behalf of a reader
    pub fn lend(
        &mut self,
        performed_by: &Actor,
        reader_id: &str,
        title_id: i32,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        performed_by.require_staff()?;
        self.borrow(reader_id, title_id, now)
    }

    /// Borrow a title for a reader
    pub fn borrow(
        &mut self,
        reader_id: &str,
        title_id: i32,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let reader = self.ledger.get(reader_id)?;
        if !reader.role.may_borrow() {
            return Err(CirculationError::RoleNotEligible(reader_id.to_string()));
        }
        if self.catalog.available_copies(title_id)? == 0 {
            return Err(CirculationError::NoCopiesAvailable(title_id));
        }

        let reader = self.ledger.normalize(reader_id, now)?;
        LoanLedger::check_borrowing_limits(reader, &self.policy, now)?;
        if reader.open_loan_position(title_id).is_some() {
            return Err(CirculationError::DuplicateLoan(title_id));
        }

        self.catalog.check_out(title_id)?;
        let due_on = self
            .ledger
            .open_loan(reader_id, title_id, &self.policy, now)?
            .due_on;

        // A loan supersedes the reader's own reservation for the title
        let reader = self.ledger.get_mut(reader_id)?;
        if reader.remove_reservation(title_id) {
            self.queue.remove(title_id, reader_id);
        }

        Ok(LoanReceipt {
            reader_id: reader_id.to_string(),
            reader_name: reader.name.clone(),
            title_id,
            title: self.catalog.get(title_id)?.title.clone(),
            due_on,
        })
    }

    /// Join a title's waitlist
    pub fn reserve(
        &mut self,
        reader_id: &str,
        title_id: i32,
        now: DateTime<Utc>,
    ) -> Result<ReservationReceipt, CirculationError> {
        let reader = self.ledger.get(reader_id)?;
        if !reader.role.may_borrow() {
            return Err(CirculationError::RoleNotEligible(reader_id.to_string()));
        }
        if self.catalog.available_copies(title_id)? > 0 {
            return Err(CirculationError::CopiesAvailableUseBorrow(title_id));
        }
        if self.queue.contains(title_id, reader_id) || reader.has_reservation(title_id) {
            return Err(CirculationError::AlreadyReserved(title_id));
        }

        let reader = self.ledger.normalize(reader_id, now)?;
        if reader.open_loan_position(title_id).is_some() {
            return Err(CirculationError::AlreadyBorrowed(title_id));
        }

        let reservation = Reservation {
            reader_id: reader_id.to_string(),
            reader_name: reader.name.clone(),
            reserved_on: now,
        };
        let position = self.queue.enqueue(title_id, reservation);
        self.ledger.get_mut(reader_id)?.reservations.push(title_id);

        Ok(ReservationReceipt {
            reader_id: reader_id.to_string(),
            title_id,
            title: self.catalog.get(title_id)?.title.clone(),
            position,
        })
    }

    /// Leave a title's waitlist
    pub fn cancel_reservation(
        &mut self,
        performed_by: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> Result<CancellationReceipt, CirculationError> {
        performed_by.require_staff_or_self(reader_id)?;
        let reader = self.ledger.get(reader_id)?;
        let title = self.catalog.get(title_id)?.title.clone();
        if !reader.has_reservation(title_id) {
            return Err(CirculationError::ReservationNotFound(title_id));
        }

        self.ledger.get_mut(reader_id)?.remove_reservation(title_id);
        self.queue.remove(title_id, reader_id);

        Ok(CancellationReceipt {
            reader_id: reader_id.to_string(),
            title_id,
            title,
        })
    }

    /// Check a copy back in and hand it to the head of the queue if they are
    /// eligible
    pub fn return_loan(
        &mut self,
        performed_by: &Actor,
        reader_id: &str,
        title_id: i32,
        now: DateTime<Utc>,
    ) -> Result<ReturnReceipt, CirculationError> {
        performed_by.require_staff()?;
        let reader = self.ledger.get(reader_id)?;
        let title = self.catalog.get(title_id)?.title.clone();
        if reader.open_loan_position(title_id).is_none() {
            return Err(CirculationError::ActiveLoanNotFound(title_id));
        }

        let closed = self
            .ledger
            .close_loan(reader_id, title_id, &self.policy, now)?
            .clone();
        self.catalog.check_in(title_id)?;
        let auto_assigned = self.assign_next(title_id, now)?;

        Ok(ReturnReceipt {
            reader_id: reader_id.to_string(),
            reader_name: self.ledger.get(reader_id)?.name.clone(),
            title_id,
            title,
            status: closed.status,
            fee: closed.fee_owed,
            auto_assigned,
        })
    }

    fn assign_next(
        &mut self,
        title_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AutoAssignment>, CirculationError> {
        let Self {
            policy,
            catalog,
            ledger,
            queue,
        } = self;

        let outcome = queue.resolve_head(title_id, |head| {
            let Ok(candidate) = ledger.normalize(&head.reader_id, now) else {
                return HeadDecision::Discard;
            };
            if candidate.open_loan_position(title_id).is_some() {
                return HeadDecision::Discard;
            }
            match LoanLedger::check_borrowing_limits(candidate, policy, now) {
                Ok(()) => HeadDecision::Assign,
                Err(_) => HeadDecision::Hold,
            }
        });

        match outcome {
            HeadOutcome::Assigned(reservation) => {
                catalog.check_out(title_id)?;
                let due_on = ledger
                    .open_loan(&reservation.reader_id, title_id, policy, now)?
                    .due_on;
                let next = ledger.get_mut(&reservation.reader_id)?;
                next.remove_reservation(title_id);
                Ok(Some(AutoAssignment {
                    reader_id: next.id.clone(),
                    reader_name: next.name.clone(),
                    due_on,
                }))
            }
            HeadOutcome::Discarded(reservation) => {
                tracing::warn!(
                    title_id,
                    reader_id = %reservation.reader_id,
                    "Discarded reservation of unknown or already-lending reader"
                );
                if let Ok(reader) = ledger.get_mut(&reservation.reader_id) {
                    reader.remove_reservation(title_id);
                }
                Ok(None)
            }
            HeadOutcome::Held | HeadOutcome::Empty => Ok(None),
        }
    }

    /// Record payment of a late-return fee
    pub fn settle_fee(
        &mut self,
        performed_by: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> Result<SettlementReceipt, CirculationError> {
        performed_by.require_staff()?;
        self.ledger.get(reader_id)?;
        let title = self.catalog.get(title_id)?.title.clone();

        let amount_paid = self.ledger.settle_fee(reader_id, title_id)?;

        Ok(SettlementReceipt {
            reader_id: reader_id.to_string(),
            reader_name: self.ledger.get(reader_id)?.name.clone(),
            title_id,
            title,
            amount_paid,
        })
    }

    /// Extend an unfinished loan by one loan period
    pub fn renew(
        &mut self,
        performed_by: &Actor,
        reader_id: &str,
        title_id: i32,
        now: DateTime<Utc>,
    ) -> Result<RenewalReceipt, CirculationError> {
        performed_by.require_staff_or_self(reader_id)?;
        self.ledger.get(reader_id)?;
        let title = self.catalog.get(title_id)?.title.clone();

        let due_on = self
            .ledger
            .renew_loan(reader_id, title_id, &self.policy, now)?
            .due_on;

        Ok(RenewalReceipt {
            reader_id: reader_id.to_string(),
            reader_name: self.ledger.get(reader_id)?.name.clone(),
            title_id,
            title,
            due_on,
        })
    }

    /// Current debt of a reader
    pub fn statement(
        &self,
        performed_by: &Actor,
        reader_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountStatement, CirculationError> {
        performed_by.require_staff_or_self(reader_id)?;
        let reader = self.ledger.get(reader_id)?;
        let fines = self.policy.fines();

        let mut loans: Vec<Loan> = reader.loans.clone();
        normalize_statuses(&mut loans, now);

        let open_loans = loans
            .iter()
            .filter(|loan| loan.is_open())
            .map(|loan| StatementLine {
                title_id: loan.title_id,
                borrowed_on: loan.borrowed_on,
                due_on: loan.due_on,
                status: loan.status,
                accrued_fee: fines.compute_fee(loan, now),
            })
            .collect();
        let unsettled_fees = loans
            .iter()
            .filter(|loan| loan.status == LoanStatus::ReturnedLate)
            .map(|loan| loan.fee_owed)
            .sum();

        Ok(AccountStatement {
            reader_id: reader.id.clone(),
            reader_name: reader.name.clone(),
            open_debt: fines.compute_total_owed(&loans, now),
            unsettled_fees,
            open_loans,
        })
    }

    // ------------------------------------------------------------------
    // Catalog and reader administration
    // ------------------------------------------------------------------

    pub fn add_title(&mut self, request: CreateTitle) -> Title {
        let title = Title {
            id: self.next_title_id(),
            title: request.title,
            author: request.author,
            publisher: request.publisher,
            edition: request.edition,
            isbn: request.isbn,
            categories: request.categories,
            year: request.year,
            location: request.location,
            total_copies: request.total_copies,
            on_loan_count: 0,
            reservation_queue: Vec::new(),
        };
        self.catalog.insert(title.clone());
        title
    }

    /// Ids stay unique across removals: a past loan may still name a removed title
    fn next_title_id(&self) -> i32 {
        let referenced = self
            .ledger
            .iter()
            .flat_map(|reader| reader.loans.iter().map(|loan| loan.title_id))
            .max()
            .map_or(1, |id| id + 1);
        self.catalog.next_id().max(referenced)
    }

    /// Apply a partial update; loans and the waitlist are untouched
    pub fn update_title(&mut self, title_id: i32, update: UpdateTitle) -> AppResult<Title> {
        let title = self.catalog.get_mut(title_id)?;
        if let Some(total) = update.total_copies {
            if total < title.on_loan_count {
                return Err(AppError::Validation(format!(
                    "Title {} has {} copies on loan; total copies cannot be {}",
                    title_id, title.on_loan_count, total
                )));
            }
        }

        if let Some(value) = update.title {
            title.title = value;
        }
        if let Some(value) = update.author {
            title.author = value;
        }
        if let Some(value) = update.publisher {
            title.publisher = value;
        }
        if let Some(value) = update.edition {
            title.edition = value;
        }
        if let Some(value) = update.isbn {
            title.isbn = Some(value);
        }
        if let Some(value) = update.categories {
            title.categories = value;
        }
        if let Some(value) = update.year {
            title.year = Some(value);
        }
        if let Some(value) = update.location {
            title.location = value;
        }
        if let Some(value) = update.total_copies {
            title.total_copies = value;
        }

        Ok(title.clone())
    }

    /// Remove a title with no copies out and no unpaid fees, dropping its
    /// waitlist
    pub fn remove_title(&mut self, title_id: i32) -> AppResult<Title> {
        let title = self.catalog.get(title_id)?;
        if title.on_loan_count > 0 {
            return Err(AppError::Conflict(format!(
                "Title {} has {} copies on loan",
                title_id, title.on_loan_count
            )));
        }
        let owing = self.ledger.iter().find(|reader| {
            reader
                .loans
                .iter()
                .any(|loan| loan.title_id == title_id && loan.fee_owed > Decimal::ZERO)
        });
        if let Some(reader) = owing {
            return Err(AppError::Conflict(format!(
                "Reader {} has an unsettled fee on title {}",
                reader.id, title_id
            )));
        }

        for reservation in self.queue.drop_title(title_id) {
            if let Ok(reader) = self.ledger.get_mut(&reservation.reader_id) {
                reader.remove_reservation(title_id);
            }
        }
        self.catalog
            .remove(title_id)
            .ok_or_else(|| CirculationError::TitleNotFound(title_id).into())
    }

    pub fn register_reader(&mut self, reader: Reader) -> AppResult<()> {
        if self.ledger.contains(&reader.id) {
            return Err(AppError::Conflict(format!(
                "Reader {} is already registered",
                reader.id
            )));
        }
        if self
            .ledger
            .iter()
            .any(|existing| existing.registration == reader.registration)
        {
            return Err(AppError::Conflict(format!(
                "Registration number {} is already in use",
                reader.registration
            )));
        }

        self.ledger.insert(reader);
        Ok(())
    }

    /// Remove a reader with no copies out and no unpaid fees, withdrawing
    /// their reservations
    pub fn remove_reader(&mut self, reader_id: &str) -> AppResult<Reader> {
        let reader = self.ledger.get(reader_id)?;
        let open = reader.open_loan_count();
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Reader {} still holds {} unfinished loans",
                reader_id, open
            )));
        }
        let unsettled: Decimal = reader.loans.iter().map(|loan| loan.fee_owed).sum();
        if unsettled > Decimal::ZERO {
            return Err(AppError::Conflict(format!(
                "Reader {} has {} in unsettled fees",
                reader_id, unsettled
            )));
        }

        self.queue.remove_reader(reader_id);
        self.ledger
            .remove(reader_id)
            .ok_or_else(|| CirculationError::ReaderNotFound(reader_id.to_string()).into())
    }
}
