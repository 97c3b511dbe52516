//! Transactions repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Pagination, Transaction},
};

use super::unique_violation;

pub const BOOK_NOT_AVAILABLE: &str = "Book is not available";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Transaction>;
    async fn has_open_for_book(&self, book_id: i32) -> AppResult<bool>;
    async fn has_open_for_user(&self, user_id: i32) -> AppResult<bool>;
    /// Open a transaction and mark the book unavailable, atomically
    async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Transaction>;
    /// Close an open transaction and mark the book available, atomically
    async fn return_book(&self, id: i32) -> AppResult<Transaction>;
    async fn list(&self, pagination: Pagination, open_only: bool) -> AppResult<(Vec<Transaction>, i64)>;
}

#[derive(Clone)]
pub struct TransactionsRepository {
    pool: Pool<Postgres>,
}

impl TransactionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for TransactionsRepository {
    /// Get transaction by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Transaction> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    async fn has_open_for_book(&self, book_id: i32) -> AppResult<bool> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }

    async fn has_open_for_user(&self, user_id: i32) -> AppResult<bool> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE user_id = $1 AND returned_at IS NULL)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }

    async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        // Lock the book row so concurrent borrows of the same book serialize here
        let found: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }

        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_borrowed {
            return Err(AppError::Conflict(BOOK_NOT_AVAILABLE.to_string()));
        }

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (user_id, book_id, borrowed_at)
            VALUES ($1, $2, NOW())
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Conflict(BOOK_NOT_AVAILABLE.to_string()),
            None => e.into(),
        })?;

        sqlx::query(
            r#"
            UPDATE books
            SET is_available = FALSE, borrow_count = borrow_count + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    async fn return_book(&self, id: i32) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))?;

        if !transaction.is_open() {
            return Err(AppError::Conflict("Book already returned".to_string()));
        }

        let returned = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions SET returned_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET is_available = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(transaction.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(returned)
    }

    /// List transactions, newest first
    async fn list(&self, pagination: Pagination, open_only: bool) -> AppResult<(Vec<Transaction>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE (NOT $1 OR returned_at IS NULL)",
        )
        .bind(open_only)
        .fetch_one(&self.pool)
        .await?;

        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE (NOT $1 OR returned_at IS NULL)
            ORDER BY borrowed_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(open_only)
        .bind(pagination.limit)
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((transactions, total))
    }
}
