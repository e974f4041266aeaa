//! API handlers for the circulation desk REST endpoints

pub mod auth;
pub mod circulation;
pub mod health;
pub mod openapi;
pub mod readers;
pub mod titles;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{reader::ReaderClaims, Actor},
    AppState,
};

/// Extractor for the calling reader, from a JWT bearer token
pub struct AuthenticatedReader(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedReader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing bearer token".to_string()))?;

        let claims = ReaderClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let actor = state.services.readers.resolve(&claims).await?;
        Ok(AuthenticatedReader(actor))
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Readers
        .route("/readers", get(readers::list_readers).post(readers::register))
        .route(
            "/readers/:id",
            get(readers::get_reader).delete(readers::delete_reader),
        )
        .route("/readers/:id/statement", get(readers::get_statement))
        // Titles
        .route("/titles", get(titles::list_titles).post(titles::create_title))
        .route(
            "/titles/:id",
            get(titles::get_title)
                .put(titles::update_title)
                .delete(titles::delete_title),
        )
        .route("/titles/:id/reservations", get(titles::list_reservations))
        // Circulation
        .route("/circulation/lend", post(circulation::lend))
        .route("/circulation/borrow", post(circulation::borrow))
        .route("/circulation/return", post(circulation::return_loan))
        .route("/circulation/renew", post(circulation::renew))
        .route("/circulation/reserve", post(circulation::reserve))
        .route(
            "/circulation/cancel-reservation",
            post(circulation::cancel_reservation),
        )
        .route("/circulation/settle-fee", post(circulation::settle_fee))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
