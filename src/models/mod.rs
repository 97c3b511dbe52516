//! Data models for the library server

pub mod book;
pub mod pagination;
pub mod transaction;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BorrowedBook, FrequentlyBorrowedBook};
pub use pagination::Pagination;
pub use transaction::Transaction;
pub use user::{Role, User, UserClaims};
