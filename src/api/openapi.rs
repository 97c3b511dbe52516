//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, transactions, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library book, user and borrowing REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        // Books
        books::add_book,
        books::update_book,
        books::delete_book,
        books::get_book,
        books::borrowed_books,
        books::list_books,
        books::frequently_borrowed,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        // Transactions
        transactions::borrow_book,
        transactions::return_book,
        transactions::get_transaction,
        transactions::list_transactions,
    ),
    components(
        schemas(
            // Auth
            auth::LoginResponse,
            crate::models::user::LoginRequest,
            crate::models::user::RegisterUser,
            // Books
            crate::models::book::Book,
            crate::models::book::BorrowedBook,
            crate::models::book::FrequentlyBorrowedBook,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            books::BookPage,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::UpdateUser,
            books::UserPage,
            // Transactions
            crate::models::transaction::Transaction,
            crate::models::transaction::BorrowRequest,
            books::TransactionPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and sessions"),
        (name = "books", description = "Book catalog"),
        (name = "users", description = "User management"),
        (name = "transactions", description = "Borrowing and returns")
    )
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
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

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
