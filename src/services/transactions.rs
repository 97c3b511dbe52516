//! Borrow/return service

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Pagination, Transaction},
    repository::{TransactionStore, UserStore},
};

#[derive(Clone)]
pub struct TransactionsService {
    transactions: Arc<dyn TransactionStore>,
    users: Arc<dyn UserStore>,
}

impl TransactionsService {
    pub fn new(transactions: Arc<dyn TransactionStore>, users: Arc<dyn UserStore>) -> Self {
        Self { transactions, users }
    }

    /// Borrow a book for a user; fails while the book has an open transaction
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Transaction> {
        // Verify user exists
        self.users.get_by_id(user_id).await?;

        let transaction = self.transactions.borrow(user_id, book_id).await?;
        tracing::info!(
            transaction_id = transaction.id,
            user_id,
            book_id,
            "Book borrowed"
        );
        Ok(transaction)
    }

    /// Close a transaction, making its book available again
    pub async fn return_book(&self, transaction_id: i32) -> AppResult<Transaction> {
        let transaction = self.transactions.return_book(transaction_id).await?;
        tracing::info!(
            transaction_id,
            book_id = transaction.book_id,
            "Book returned"
        );
        Ok(transaction)
    }

    pub async fn get(&self, transaction_id: i32) -> AppResult<Transaction> {
        self.transactions.get_by_id(transaction_id).await
    }

    pub async fn list(&self, pagination: Pagination, open_only: bool) -> AppResult<(Vec<Transaction>, i64)> {
        self.transactions.list(pagination, open_only).await
    }
}
