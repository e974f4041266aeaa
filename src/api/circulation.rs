//! Circulation endpoints: lending, returns, renewals, reservations and fees

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    circulation::desk::{
        CancellationReceipt, LoanReceipt, RenewalReceipt, ReservationReceipt, ReturnReceipt,
        SettlementReceipt,
    },
    error::AppResult,
};

use super::AuthenticatedReader;

/// A title, for the calling reader
#[derive(Deserialize, ToSchema)]
pub struct TitleRequest {
    pub title_id: i32,
}

/// A reader and a title
#[derive(Deserialize, ToSchema)]
pub struct ReaderTitleRequest {
    pub reader_id: String,
    pub title_id: i32,
}

/// A title, for the caller or (staff only) another reader
#[derive(Deserialize, ToSchema)]
pub struct OnBehalfRequest {
    /// Defaults to the calling reader
    pub reader_id: Option<String>,
    pub title_id: i32,
}

/// Staff lends a title to a reader
#[utoipa::path(
    post,
    path = "/circulation/lend",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = ReaderTitleRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanReceipt),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader or title not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Borrowing rules not met", body = crate::error::ErrorResponse)
    )
)]
pub async fn lend(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<ReaderTitleRequest>,
) -> AppResult<(StatusCode, Json<LoanReceipt>)> {
    let receipt = state
        .services
        .circulation
        .lend(&actor, &request.reader_id, request.title_id)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Borrow a title for the calling reader
#[utoipa::path(
    post,
    path = "/circulation/borrow",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = TitleRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanReceipt),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Borrowing rules not met", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<TitleRequest>,
) -> AppResult<(StatusCode, Json<LoanReceipt>)> {
    let receipt = state
        .services
        .circulation
        .borrow(&actor, request.title_id)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Return a copy; it may pass straight to the next reservation
#[utoipa::path(
    post,
    path = "/circulation/return",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = ReaderTitleRequest,
    responses(
        (status = 200, description = "Copy returned", body = ReturnReceipt),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader, title or loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<ReaderTitleRequest>,
) -> AppResult<Json<ReturnReceipt>> {
    let receipt = state
        .services
        .circulation
        .return_loan(&actor, &request.reader_id, request.title_id)
        .await?;
    Ok(Json(receipt))
}

/// Renew an unfinished loan
#[utoipa::path(
    post,
    path = "/circulation/renew",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = OnBehalfRequest,
    responses(
        (status = 200, description = "Loan renewed", body = RenewalReceipt),
        (status = 403, description = "Not staff and not the reader", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader, title or loan not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Too early or debt limit reached", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<OnBehalfRequest>,
) -> AppResult<Json<RenewalReceipt>> {
    let reader_id = request.reader_id.unwrap_or_else(|| actor.reader_id.clone());
    let receipt = state
        .services
        .circulation
        .renew(&actor, &reader_id, request.title_id)
        .await?;
    Ok(Json(receipt))
}

/// Join a title's waitlist
#[utoipa::path(
    post,
    path = "/circulation/reserve",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = TitleRequest,
    responses(
        (status = 201, description = "Reservation queued", body = ReservationReceipt),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Copies available or already queued", body = crate::error::ErrorResponse)
    )
)]
pub async fn reserve(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<TitleRequest>,
) -> AppResult<(StatusCode, Json<ReservationReceipt>)> {
    let receipt = state
        .services
        .circulation
        .reserve(&actor, request.title_id)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Leave a title's waitlist
#[utoipa::path(
    post,
    path = "/circulation/cancel-reservation",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = OnBehalfRequest,
    responses(
        (status = 200, description = "Reservation cancelled", body = CancellationReceipt),
        (status = 403, description = "Not staff and not the reader", body = crate::error::ErrorResponse),
        (status = 404, description = "No such reservation", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<OnBehalfRequest>,
) -> AppResult<Json<CancellationReceipt>> {
    let reader_id = request.reader_id.unwrap_or_else(|| actor.reader_id.clone());
    let receipt = state
        .services
        .circulation
        .cancel_reservation(&actor, &reader_id, request.title_id)
        .await?;
    Ok(Json(receipt))
}

/// Record payment of a late-return fee
#[utoipa::path(
    post,
    path = "/circulation/settle-fee",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = ReaderTitleRequest,
    responses(
        (status = 200, description = "Fee settled", body = SettlementReceipt),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse),
        (status = 404, description = "No pending fee", body = crate::error::ErrorResponse)
    )
)]
pub async fn settle_fee(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<ReaderTitleRequest>,
) -> AppResult<Json<SettlementReceipt>> {
    let receipt = state
        .services
        .circulation
        .settle_fee(&actor, &request.reader_id, request.title_id)
        .await?;
    Ok(Json(receipt))
}
