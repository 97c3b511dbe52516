//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{normalize_isbn, Book, BorrowedBook, CreateBook, FrequentlyBorrowedBook, UpdateBook},
        Pagination,
    },
};

use super::{search_term, unique_violation};

const DUPLICATE_ISBN: &str = "A book with this ISBN already exists";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    async fn create(&self, book: &CreateBook) -> AppResult<Book>;
    async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book>;
    /// Returns false when no row had that id
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn search(&self, pagination: Pagination, search: Option<String>) -> AppResult<(Vec<Book>, i64)>;
    async fn borrowed_by_user(&self, user_id: i32) -> AppResult<Vec<BorrowedBook>>;
    async fn frequently_borrowed(&self, limit: i64) -> AppResult<Vec<FrequentlyBorrowedBook>>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_isbn_conflict(err: sqlx::Error) -> AppError {
    match unique_violation(&err) {
        Some(_) => AppError::Conflict(DUPLICATE_ISBN.to_string()),
        None => err.into(),
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    /// Get book by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if ISBN already exists
    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(normalize_isbn(isbn))
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a new book
    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, genre, publication_year, isbn)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(book.title.trim())
        .bind(book.author.trim())
        .bind(book.genre.trim())
        .bind(book.publication_year)
        .bind(book.isbn.as_deref().map(normalize_isbn))
        .fetch_one(&self.pool)
        .await
        .map_err(map_isbn_conflict)
    }

    /// Merge the present fields into an existing book
    async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($1::text, title),
                author = COALESCE($2::text, author),
                genre = COALESCE($3::text, genre),
                publication_year = COALESCE($4::int, publication_year),
                isbn = COALESCE($5::text, isbn),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(book.title.as_deref().map(str::trim))
        .bind(book.author.as_deref().map(str::trim))
        .bind(book.genre.as_deref().map(str::trim))
        .bind(book.publication_year)
        .bind(book.isbn.as_deref().map(normalize_isbn))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_isbn_conflict)?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book; its closed transactions go with it
    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Search books by title/author with pagination, ordered by id
    async fn search(&self, pagination: Pagination, search: Option<String>) -> AppResult<(Vec<Book>, i64)> {
        let pattern = search_term(search.as_deref());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(pagination.limit)
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Every book a user has borrowed, most recent first
    async fn borrowed_by_user(&self, user_id: i32) -> AppResult<Vec<BorrowedBook>> {
        let books = sqlx::query_as::<_, BorrowedBook>(
            r#"
            SELECT b.*,
                   t.id AS transaction_id,
                   t.borrowed_at,
                   t.returned_at,
                   (t.returned_at IS NULL) AS currently_borrowed
            FROM transactions t
            JOIN books b ON b.id = t.book_id
            WHERE t.user_id = $1
            ORDER BY t.borrowed_at DESC, t.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Books ranked by transaction count, ties broken by id
    async fn frequently_borrowed(&self, limit: i64) -> AppResult<Vec<FrequentlyBorrowedBook>> {
        let books = sqlx::query_as::<_, FrequentlyBorrowedBook>(
            r#"
            SELECT b.*, COUNT(t.id) AS times_borrowed
            FROM books b
            JOIN transactions t ON t.book_id = b.id
            GROUP BY b.id
            ORDER BY times_borrowed DESC, b.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}
