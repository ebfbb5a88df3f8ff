//! Catalog management service (authors and books)

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Authors

    pub async fn search_authors(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        self.repository.authors.search(query).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        self.repository.authors.create(&author).await
    }

    pub async fn update_author(&self, id: i32, update: UpdateAuthor) -> AppResult<Author> {
        self.repository.authors.update(id, &update).await
    }

    /// Delete an author; their books and those books' loans cascade away
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }

    // Books

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    pub async fn list_available_books(&self) -> AppResult<Vec<BookDetails>> {
        self.repository.books.list_available().await
    }

    /// Create a book after checking the author exists and the ISBN is free
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        self.repository.authors.get_by_id(book.author_id).await?;

        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Validation(format!(
                "isbn: a book with ISBN {} already exists",
                book.isbn
            )));
        }

        self.repository.books.create(&book).await
    }

    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        if let Some(author_id) = update.author_id {
            self.repository.authors.get_by_id(author_id).await?;
        }

        if let Some(ref isbn) = update.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Validation(format!(
                    "isbn: a book with ISBN {} already exists",
                    isbn
                )));
            }
        }

        self.repository.books.update(id, &update).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
