//! Borrow/return transaction model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Transaction as stored in the `transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    /// Null while the book is out
    pub returned_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[validate(range(min = 1, message = "Invalid book id"))]
    pub book_id: i32,
    /// Borrower, defaults to the caller; another user requires admin rights
    #[validate(range(min = 1, message = "Invalid user id"))]
    pub user_id: Option<i32>,
}

/// Transaction list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    /// Page number (default: 1)
    pub page: Option<String>,
    /// Transactions per page (default: 10, max: 100)
    pub limit: Option<String>,
    /// Only unreturned transactions when "true"
    pub open: Option<String>,
}
