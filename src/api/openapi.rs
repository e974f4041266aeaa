//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, circulation, health, readers, titles};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation Desk API",
        version = "1.0.0",
        description = "Library lending, reservation and fine REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::me,
        // Readers
        readers::register,
        readers::list_readers,
        readers::get_reader,
        readers::delete_reader,
        readers::get_statement,
        // Titles
        titles::list_titles,
        titles::get_title,
        titles::create_title,
        titles::update_title,
        titles::delete_title,
        titles::list_reservations,
        // Circulation
        circulation::lend,
        circulation::borrow,
        circulation::return_loan,
        circulation::renew,
        circulation::reserve,
        circulation::cancel_reservation,
        circulation::settle_fee,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Readers
            crate::models::Role,
            crate::models::ReaderDetails,
            crate::models::reader::CreateReader,
            crate::models::Loan,
            crate::models::LoanStatus,
            // Titles
            crate::models::TitleDetails,
            crate::models::title::CreateTitle,
            crate::models::title::UpdateTitle,
            crate::models::Reservation,
            // Circulation
            circulation::TitleRequest,
            circulation::ReaderTitleRequest,
            circulation::OnBehalfRequest,
            crate::circulation::desk::LoanReceipt,
            crate::circulation::desk::ReservationReceipt,
            crate::circulation::desk::CancellationReceipt,
            crate::circulation::desk::ReturnReceipt,
            crate::circulation::desk::AutoAssignment,
            crate::circulation::desk::SettlementReceipt,
            crate::circulation::desk::RenewalReceipt,
            crate::circulation::desk::AccountStatement,
            crate::circulation::desk::StatementLine,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "readers", description = "Reader management"),
        (name = "titles", description = "Catalog management"),
        (name = "circulation", description = "Loans, reservations and fees")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
