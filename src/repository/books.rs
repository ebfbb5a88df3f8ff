//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, BookQuery, BookRow, CreateBook, UpdateBook},
};

const BOOK_COLUMNS: &str = "b.id, b.title, b.author_id, b.isbn, b.publication_date, \
     b.genre, b.page_count, b.available, \
     a.first_name AS author_first_name, a.last_name AS author_last_name";

fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering {
        Some("title") => "b.title ASC",
        Some("-title") => "b.title DESC",
        Some("publication_date") => "b.publication_date ASC",
        _ => "b.publication_date DESC",
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if let Some(genre) = query.genre {
        qb.push(" AND b.genre = ").push_bind(genre);
    }

    if let Some(available) = query.available {
        qb.push(" AND b.available = ").push_bind(available);
    }

    if let Some(author_id) = query.author_id {
        qb.push(" AND b.author_id = ").push_bind(author_id);
    }

    if let Some(ref search) = query.search {
        let term = format!("%{}%", search.to_lowercase());
        qb.push(" AND (LOWER(b.title) LIKE ")
            .push_bind(term.clone())
            .push(" OR LOWER(a.first_name) LIKE ")
            .push_bind(term.clone())
            .push(" OR LOWER(a.last_name) LIKE ")
            .push_bind(term)
            .push(")");
    }
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID (raw row, no author join)
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book with author details
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books b JOIN authors a ON a.id = b.author_id WHERE b.id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        Ok(row.into())
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        let (page, per_page) = crate::models::pagination(query.page, query.per_page);
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM books b JOIN authors a ON a.id = b.author_id WHERE 1=1",
        );
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM books b JOIN authors a ON a.id = b.author_id WHERE 1=1",
            BOOK_COLUMNS
        ));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref()))
            .push(" LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<BookRow>().fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// List all currently available books
    pub async fn list_available(&self) -> AppResult<Vec<BookDetails>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books b JOIN authors a ON a.id = b.author_id \
             WHERE b.available = TRUE ORDER BY b.publication_date DESC",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Check if an ISBN is already taken by another book
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create a new book (available by default)
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, isbn, publication_date, genre, page_count, available)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(book.genre)
        .bind(book.page_count)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing book. The `available` flag is owned by the loan
    /// workflow and is never touched here.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let existing = self.get_by_id(id).await?;

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, isbn = $3, publication_date = $4,
                genre = $5, page_count = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(update.title.as_ref().unwrap_or(&existing.title))
        .bind(update.author_id.unwrap_or(existing.author_id))
        .bind(update.isbn.as_ref().unwrap_or(&existing.isbn))
        .bind(update.publication_date.unwrap_or(existing.publication_date))
        .bind(update.genre.unwrap_or(existing.genre))
        .bind(update.page_count.unwrap_or(existing.page_count))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete a book. Its loans are removed by cascade.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
