//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, health, loans, users};

struct SecurityAddon;

impl Modify for SecurityAddon {
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

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "0.1.0",
        description = "Library Loan Management REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::list_available_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::lend_book,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::return_loan,
        loans::delete_loan,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::delete_user,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            health::HealthResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::AuthorSummary,
            crate::models::book::Genre,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            books::LendResponse,
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            loans::ReturnResponse,
            crate::models::user::User,
            crate::models::user::AccountType,
            crate::models::user::CreateUser,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Authentication"),
        (name = "authors", description = "Author catalog"),
        (name = "books", description = "Book catalog"),
        (name = "loans", description = "Loan workflow"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
