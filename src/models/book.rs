//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::validation::validate_not_blank;

/// Book as stored in the `books` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_year: i32,
    /// Normalized ISBN-10 or ISBN-13, unique when present
    pub isbn: Option<String>,
    /// False while the book has an open transaction
    pub is_available: bool,
    /// Number of transactions ever opened for this book
    pub borrow_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A book borrowed by a user, with the transaction it was borrowed through
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowedBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub transaction_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    /// True while this transaction is still open
    pub currently_borrowed: bool,
}

/// A book with the number of transactions recorded for it
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrequentlyBorrowedBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub times_borrowed: i64,
}

/// Strip separators from an ISBN, keeping digits and a trailing check 'X'
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let normalized = normalize_isbn(isbn);
    let only_separators = isbn
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, 'x' | 'X' | '-' | ' '));

    let valid = only_separators
        && match normalized.len() {
            10 => normalized[..9].chars().all(|c| c.is_ascii_digit()),
            13 => normalized.chars().all(|c| c.is_ascii_digit()),
            _ => false,
        };

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("isbn");
        err.message = Some("ISBN must have 10 or 13 digits".into());
        Err(err)
    }
}

/// Add book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 255, message = "Title must be at most 255 characters")
    )]
    pub title: String,
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 255, message = "Author must be at most 255 characters")
    )]
    pub author: String,
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Genre must be at most 100 characters")
    )]
    pub genre: String,
    #[validate(range(min = 0, max = 9999, message = "Publication year must be between 0 and 9999"))]
    pub publication_year: i32,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
}

/// Update book request; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 255, message = "Title must be at most 255 characters")
    )]
    pub title: Option<String>,
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 255, message = "Author must be at most 255 characters")
    )]
    pub author: Option<String>,
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Genre must be at most 100 characters")
    )]
    pub genre: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Publication year must be between 0 and 9999"))]
    pub publication_year: Option<i32>,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
}

/// Book list query parameters.
///
/// Kept as raw strings so malformed values fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Page number (default: 1)
    pub page: Option<String>,
    /// Books per page (default: 10, max: 100)
    pub limit: Option<String>,
    /// Case-insensitive substring matched against title and author
    pub search: Option<String>,
}

/// Frequently-borrowed query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FrequentlyBorrowedQuery {
    /// Number of books to return (default: 10, max: 100)
    pub limit: Option<String>,
}
