//! Circulation service: borrowing, returns, renewals, reservations and fees

use std::sync::Arc;

use crate::{
    circulation::{
        desk::{
            AccountStatement, CancellationReceipt, LoanReceipt, RenewalReceipt,
            ReservationReceipt, ReturnReceipt, SettlementReceipt,
        },
        Clock,
    },
    error::AppResult,
    models::Actor,
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl CirculationService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Staff lends a title to a reader
    pub async fn lend(
        &self,
        actor: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> AppResult<LoanReceipt> {
        let now = self.clock.now();
        let receipt = self
            .repository
            .transact(|desk| desk.lend(actor, reader_id, title_id, now))
            .await?;

        tracing::info!(
            staff = %actor.reader_id,
            reader_id,
            title_id,
            due_on = %receipt.due_on,
            "Title lent"
        );
        Ok(receipt)
    }

    /// The caller borrows a title for themselves
    pub async fn borrow(&self, actor: &Actor, title_id: i32) -> AppResult<LoanReceipt> {
        let now = self.clock.now();
        let receipt = self
            .repository
            .transact(|desk| desk.borrow(&actor.reader_id, title_id, now))
            .await?;

        tracing::info!(
            reader_id = %actor.reader_id,
            title_id,
            due_on = %receipt.due_on,
            "Title borrowed"
        );
        Ok(receipt)
    }

    /// The caller joins a title's waitlist
    pub async fn reserve(&self, actor: &Actor, title_id: i32) -> AppResult<ReservationReceipt> {
        let now = self.clock.now();
        let receipt = self
            .repository
            .transact(|desk| desk.reserve(&actor.reader_id, title_id, now))
            .await?;

        tracing::info!(
            reader_id = %actor.reader_id,
            title_id,
            position = receipt.position,
            "Title reserved"
        );
        Ok(receipt)
    }

    pub async fn cancel_reservation(
        &self,
        actor: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> AppResult<CancellationReceipt> {
        let receipt = self
            .repository
            .transact(|desk| desk.cancel_reservation(actor, reader_id, title_id))
            .await?;

        tracing::info!(reader_id, title_id, "Reservation cancelled");
        Ok(receipt)
    }

    /// Check a copy back in; the next eligible reservation may receive it
    pub async fn return_loan(
        &self,
        actor: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> AppResult<ReturnReceipt> {
        let now = self.clock.now();
        let receipt = self
            .repository
            .transact(|desk| desk.return_loan(actor, reader_id, title_id, now))
            .await?;

        tracing::info!(
            reader_id,
            title_id,
            status = %receipt.status,
            fee = %receipt.fee,
            "Title returned"
        );
        if let Some(next) = &receipt.auto_assigned {
            tracing::info!(
                reader_id = %next.reader_id,
                title_id,
                due_on = %next.due_on,
                "Returned copy assigned to reservation holder"
            );
        }
        Ok(receipt)
    }

    pub async fn renew(
        &self,
        actor: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> AppResult<RenewalReceipt> {
        let now = self.clock.now();
        let receipt = self
            .repository
            .transact(|desk| desk.renew(actor, reader_id, title_id, now))
            .await?;

        tracing::info!(reader_id, title_id, due_on = %receipt.due_on, "Loan renewed");
        Ok(receipt)
    }

    pub async fn settle_fee(
        &self,
        actor: &Actor,
        reader_id: &str,
        title_id: i32,
    ) -> AppResult<SettlementReceipt> {
        let receipt = self
            .repository
            .transact(|desk| desk.settle_fee(actor, reader_id, title_id))
            .await?;

        tracing::info!(
            reader_id,
            title_id,
            amount = %receipt.amount_paid,
            "Fee settled"
        );
        Ok(receipt)
    }

    /// Debt summary for a reader
    pub async fn statement(&self, actor: &Actor, reader_id: &str) -> AppResult<AccountStatement> {
        let now = self.clock.now();
        let statement = self
            .repository
            .read(|desk| desk.statement(actor, reader_id, now))
            .await?;
        Ok(statement)
    }
}
