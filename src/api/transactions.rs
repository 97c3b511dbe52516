//! Borrow/return endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        pagination::parse_flag,
        transaction::{BorrowRequest, Transaction, TransactionQuery},
        Pagination,
    },
};

use super::{books::PaginatedResponse, AdminUser, AuthenticatedUser, Path, ValidatedJson};

/// Borrow a book
#[utoipa::path(
    post,
    path = "/transaction/borrow",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = Transaction),
        (status = 400, description = "Invalid request or book not available"),
        (status = 403, description = "Borrowing for another user requires admin role"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let user_id = request.user_id.unwrap_or(claims.user_id);
    if user_id != claims.user_id {
        claims.require_admin()?;
    }

    let transaction = state
        .services
        .transactions
        .borrow(user_id, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/transaction/return/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Transaction),
        (status = 400, description = "Book already returned"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Transaction>> {
    let transaction = state.services.transactions.get(id).await?;
    claims.require_self_or_admin(transaction.user_id)?;

    let returned = state.services.transactions.return_book(id).await?;
    Ok(Json(returned))
}

/// Get transaction details by ID
#[utoipa::path(
    get,
    path = "/transaction/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction details", body = Transaction),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Transaction>> {
    let transaction = state.services.transactions.get(id).await?;
    claims.require_self_or_admin(transaction.user_id)?;

    Ok(Json(transaction))
}

/// List transactions, newest first
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "List of transactions", body = TransactionPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<Transaction>>> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref());
    let open_only = parse_flag(query.open.as_deref());

    let (transactions, total) = state.services.transactions.list(pagination, open_only).await?;

    Ok(Json(PaginatedResponse::new(transactions, total, pagination)))
}
