//! Business logic services

pub mod books;
pub mod transactions;
pub mod users;

use std::sync::Arc;

use crate::{
    config::AuthConfig,
    repository::{BookStore, Repository, TransactionStore, UserStore},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub books: books::BooksService,
    pub transactions: transactions::TransactionsService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        let books: Arc<dyn BookStore> = Arc::new(repository.books);
        let users: Arc<dyn UserStore> = Arc::new(repository.users);
        let transactions: Arc<dyn TransactionStore> = Arc::new(repository.transactions);

        Self {
            users: users::UsersService::new(users.clone(), transactions.clone(), auth_config),
            books: books::BooksService::new(books, users.clone(), transactions.clone()),
            transactions: transactions::TransactionsService::new(transactions, users),
        }
    }
}
