//! Catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        title::{CreateTitle, UpdateTitle},
        Reservation, TitleDetails,
    },
};

use super::AuthenticatedReader;

/// List titles with availability
#[utoipa::path(
    get,
    path = "/titles",
    tag = "titles",
    responses(
        (status = 200, description = "Titles in catalog order", body = Vec<TitleDetails>)
    )
)]
pub async fn list_titles(
    State(state): State<crate::AppState>,
) -> Json<Vec<TitleDetails>> {
    Json(state.services.catalog.list_titles().await)
}

/// Get a title
#[utoipa::path(
    get,
    path = "/titles/{id}",
    tag = "titles",
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    responses(
        (status = 200, description = "Title details", body = TitleDetails),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_title(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<TitleDetails>> {
    let title = state.services.catalog.get_title(id).await?;
    Ok(Json(title))
}

/// Add a title to the catalog
#[utoipa::path(
    post,
    path = "/titles",
    tag = "titles",
    security(("bearer_auth" = [])),
    request_body = CreateTitle,
    responses(
        (status = 201, description = "Title created", body = TitleDetails),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_title(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Json(request): Json<CreateTitle>,
) -> AppResult<(StatusCode, Json<TitleDetails>)> {
    let title = state.services.catalog.create_title(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// Update a title
#[utoipa::path(
    put,
    path = "/titles/{id}",
    tag = "titles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    request_body = UpdateTitle,
    responses(
        (status = 200, description = "Title updated", body = TitleDetails),
        (status = 400, description = "Invalid request or fewer copies than loans", body = crate::error::ErrorResponse),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_title(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Path(id): Path<i32>,
    Json(update): Json<UpdateTitle>,
) -> AppResult<Json<TitleDetails>> {
    let title = state.services.catalog.update_title(&actor, id, update).await?;
    Ok(Json(title))
}

/// Delete a title
#[utoipa::path(
    delete,
    path = "/titles/{id}",
    tag = "titles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    responses(
        (status = 204, description = "Title deleted"),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copies are on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_title(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_title(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reservation queue of a title
#[utoipa::path(
    get,
    path = "/titles/{id}/reservations",
    tag = "titles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Title ID")
    ),
    responses(
        (status = 200, description = "Queue, head first", body = Vec<Reservation>),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedReader(actor): AuthenticatedReader,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    let entries = state.services.catalog.list_reservations(&actor, id).await?;
    Ok(Json(entries))
}
