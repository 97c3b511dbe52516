//! Book catalog service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BorrowedBook, CreateBook, FrequentlyBorrowedBook, UpdateBook},
        Pagination,
    },
    repository::{BookStore, TransactionStore, UserStore},
};

#[derive(Clone)]
pub struct BooksService {
    books: Arc<dyn BookStore>,
    users: Arc<dyn UserStore>,
    transactions: Arc<dyn TransactionStore>,
}

impl BooksService {
    pub fn new(
        books: Arc<dyn BookStore>,
        users: Arc<dyn UserStore>,
        transactions: Arc<dyn TransactionStore>,
    ) -> Self {
        Self { books, users, transactions }
    }

    /// Add a book, rejecting a duplicate ISBN before anything is written
    pub async fn add_book(&self, book: CreateBook) -> AppResult<Book> {
        if let Some(ref isbn) = book.isbn {
            if self.books.isbn_exists(isbn, None).await? {
                return Err(AppError::Conflict("A book with this ISBN already exists".to_string()));
            }
        }

        let created = self.books.create(&book).await?;
        tracing::info!(book_id = created.id, "Book added: {}", created.title);
        Ok(created)
    }

    /// Merge the present fields into an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        self.books.get_by_id(id).await?;

        if let Some(ref isbn) = book.isbn {
            if self.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Conflict("A book with this ISBN already exists".to_string()));
            }
        }

        self.books.update(id, &book).await
    }

    /// Delete a book that is not currently borrowed
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.books.get_by_id(id).await?;

        if self.transactions.has_open_for_book(id).await? {
            return Err(AppError::Conflict(
                "Book is currently borrowed and cannot be deleted".to_string(),
            ));
        }

        if !self.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    /// Page through books, optionally filtered by title/author
    pub async fn list_books(&self, pagination: Pagination, search: Option<String>) -> AppResult<(Vec<Book>, i64)> {
        self.books.search(pagination, search).await
    }

    /// Books borrowed by a user, past and current
    pub async fn borrowed_by_user(&self, user_id: i32) -> AppResult<Vec<BorrowedBook>> {
        // Verify user exists
        self.users.get_by_id(user_id).await?;
        self.books.borrowed_by_user(user_id).await
    }

    pub async fn frequently_borrowed(&self, limit: i64) -> AppResult<Vec<FrequentlyBorrowedBook>> {
        self.books.frequently_borrowed(limit).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::*;

    use super::*;
    use crate::repository::{
        books::MockBookStore, transactions::MockTransactionStore, users::MockUserStore,
    };

    fn book(id: i32, isbn: Option<&str>) -> Book {
        Book {
            id,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: "Science fiction".into(),
            publication_year: 1965,
            isbn: isbn.map(str::to_string),
            is_available: true,
            borrow_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_request(isbn: Option<&str>) -> CreateBook {
        CreateBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: "Science fiction".into(),
            publication_year: 1965,
            isbn: isbn.map(str::to_string),
        }
    }

    fn service(books: MockBookStore, users: MockUserStore, transactions: MockTransactionStore) -> BooksService {
        BooksService::new(Arc::new(books), Arc::new(users), Arc::new(transactions))
    }

    fn not_found(id: i32) -> AppResult<Book> {
        Err(AppError::NotFound(format!("Book with id {} not found", id)))
    }

    #[tokio::test]
    async fn test_duplicate_isbn_is_rejected_without_insert() {
        let mut books = MockBookStore::new();
        books
            .expect_isbn_exists()
            .with(eq("9780441172719"), eq(None))
            .times(1)
            .returning(|_, _| Ok(true));
        books.expect_create().never();

        let service = service(books, MockUserStore::new(), MockTransactionStore::new());
        let result = service.add_book(create_request(Some("9780441172719"))).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_add_without_isbn_skips_uniqueness_check() {
        let mut books = MockBookStore::new();
        books.expect_isbn_exists().never();
        books
            .expect_create()
            .times(1)
            .returning(|_| Ok(book(1, None)));

        let service = service(books, MockUserStore::new(), MockTransactionStore::new());
        let created = service.add_book(create_request(None)).await.unwrap();

        assert_eq!(created.id, 1);
        assert!(created.is_available);
    }

    #[tokio::test]
    async fn test_delete_missing_book_is_not_found_and_does_nothing() {
        let mut books = MockBookStore::new();
        books.expect_get_by_id().with(eq(42)).returning(|id| not_found(id));
        books.expect_delete().never();
        let mut transactions = MockTransactionStore::new();
        transactions.expect_has_open_for_book().never();

        let service = service(books, MockUserStore::new(), transactions);
        let result = service.delete_book(42).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_borrowed_book_is_refused() {
        let mut books = MockBookStore::new();
        books.expect_get_by_id().returning(|id| Ok(book(id, None)));
        books.expect_delete().never();
        let mut transactions = MockTransactionStore::new();
        transactions.expect_has_open_for_book().with(eq(3)).returning(|_| Ok(true));

        let service = service(books, MockUserStore::new(), transactions);
        let result = service.delete_book(3).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_available_book() {
        let mut books = MockBookStore::new();
        books.expect_get_by_id().returning(|id| Ok(book(id, None)));
        books.expect_delete().with(eq(3)).times(1).returning(|_| Ok(true));
        let mut transactions = MockTransactionStore::new();
        transactions.expect_has_open_for_book().returning(|_| Ok(false));

        let service = service(books, MockUserStore::new(), transactions);
        tokio_test::assert_ok!(service.delete_book(3).await);
    }

    #[tokio::test]
    async fn test_update_missing_book_is_not_found() {
        let mut books = MockBookStore::new();
        books.expect_get_by_id().returning(|id| not_found(id));
        books.expect_update().never();

        let service = service(books, MockUserStore::new(), MockTransactionStore::new());
        let result = service.update_book(9, UpdateBook::default()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_to_isbn_of_another_book_is_rejected() {
        let mut books = MockBookStore::new();
        books.expect_get_by_id().returning(|id| Ok(book(id, None)));
        books
            .expect_isbn_exists()
            .with(eq("0441172717"), eq(Some(5)))
            .returning(|_, _| Ok(true));
        books.expect_update().never();

        let service = service(books, MockUserStore::new(), MockTransactionStore::new());
        let update = UpdateBook {
            isbn: Some("0441172717".into()),
            ..Default::default()
        };
        let result = service.update_book(5, update).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_borrowed_by_unknown_user_is_not_found() {
        let mut users = MockUserStore::new();
        users
            .expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("User with id {} not found", id))));
        let mut books = MockBookStore::new();
        books.expect_borrowed_by_user().never();

        let service = service(books, users, MockTransactionStore::new());
        let result = service.borrowed_by_user(11).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
