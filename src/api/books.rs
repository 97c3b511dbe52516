//! Book catalog endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, BorrowedBook, CreateBook, FrequentlyBorrowedBook, FrequentlyBorrowedQuery, UpdateBook},
        transaction::Transaction,
        user::User,
        Pagination,
    },
};

use super::{AdminUser, AuthenticatedUser, Path, ValidatedJson};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(
    BookPage = PaginatedResponse<Book>,
    UserPage = PaginatedResponse<User>,
    TransactionPage = PaginatedResponse<Transaction>
)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of items
    pub items: Vec<T>,
    /// Total number of matching items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub limit: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/book/add",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book added", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn add_book(
    State(state): State<crate::AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(book): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.books.add_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/book/update/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    ValidatedJson(book): ValidatedJson<UpdateBook>,
) -> AppResult<Json<Book>> {
    let updated = state.services.books.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/book/delete/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Book is currently borrowed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.books.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/book/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_book(id).await?;
    Ok(Json(book))
}

/// Books a user has borrowed, most recent first
#[utoipa::path(
    get,
    path = "/book/borrowed/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Borrowed books", body = Vec<BorrowedBook>),
        (status = 403, description = "Not allowed to view another user's books"),
        (status = 404, description = "User not found")
    )
)]
pub async fn borrowed_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<BorrowedBook>>> {
    claims.require_self_or_admin(user_id)?;

    let books = state.services.books.borrowed_by_user(user_id).await?;
    Ok(Json(books))
}

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = BookPage)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<Book>>> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref());

    let (books, total) = state.services.books.list_books(pagination, query.search).await?;

    Ok(Json(PaginatedResponse::new(books, total, pagination)))
}

/// Most borrowed books, ties broken by lowest ID
#[utoipa::path(
    get,
    path = "/books/frequently-borrowed",
    tag = "books",
    params(FrequentlyBorrowedQuery),
    responses(
        (status = 200, description = "Most borrowed books", body = Vec<FrequentlyBorrowedBook>)
    )
)]
pub async fn frequently_borrowed(
    State(state): State<crate::AppState>,
    Query(query): Query<FrequentlyBorrowedQuery>,
) -> AppResult<Json<Vec<FrequentlyBorrowedBook>>> {
    let limit = Pagination::from_query(None, query.limit.as_deref()).limit;

    let books = state.services.books.frequently_borrowed(limit).await?;
    Ok(Json(books))
}
