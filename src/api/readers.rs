//! Reader management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    circulation::desk::AccountStatement,
    error::AppResult,
    models::{reader::CreateReader, ReaderDetails},
};

use super::AuthenticatedReader;

/// Register a new reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    request_body = CreateReader,
    responses(
        (status = 201, description = "Reader registered", body = ReaderDetails),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "Reader id or registration already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateReader>,
) -> AppResult<(StatusCode, Json<ReaderDetails>)> {
    let reader = state.services.readers.register(request).await?;
    Ok((StatusCode::CREATED, Json(reader)))
}

/// List all readers
#[utoipa::path(
    get,
    path = "/readers",
    tag = "readers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Readers in registration order", body = Vec<ReaderDetails>),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_readers(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
) -> AppResult<Json<Vec<ReaderDetails>>> {
    let readers = state.services.readers.list_readers(&actor).await?;
    Ok(Json(readers))
}

/// Get a reader with loans and reservations
#[utoipa::path(
    get,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Reader id")
    ),
    responses(
        (status = 200, description = "Reader details", body = ReaderDetails),
        (status = 403, description = "Not staff and not the reader", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reader(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Path(id): Path<String>,
) -> AppResult<Json<ReaderDetails>> {
    let reader = state.services.readers.get_reader(&actor, &id).await?;
    Ok(Json(reader))
}

/// Delete a reader
#[utoipa::path(
    delete,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Reader id")
    ),
    responses(
        (status = 204, description = "Reader deleted"),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Reader still holds loans", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_reader(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.readers.delete_reader(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current debt of a reader
#[utoipa::path(
    get,
    path = "/readers/{id}/statement",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Reader id")
    ),
    responses(
        (status = 200, description = "Account statement", body = AccountStatement),
        (status = 403, description = "Not staff and not the reader", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_statement(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Path(id): Path<String>,
) -> AppResult<Json<AccountStatement>> {
    let statement = state.services.circulation.statement(&actor, &id).await?;
    Ok(Json(statement))
}
