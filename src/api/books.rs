//! Book (catalog) endpoints, including the lend action

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Lend confirmation payload
#[derive(Serialize, ToSchema)]
pub struct LendResponse {
    /// Created loan ID
    pub loan_id: i32,
    /// Title of the lent book
    pub book_title: String,
    /// Status message
    pub message: String,
}

/// List books with filters, search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("genre" = Option<String>, Query, description = "Filter by genre"),
        ("available" = Option<bool>, Query, description = "Filter by availability"),
        ("author_id" = Option<i32>, Query, description = "Filter by author"),
        ("search" = Option<String>, Query, description = "Search in title and author names"),
        ("ordering" = Option<String>, Query, description = "Order by title or publication_date, -prefix for descending"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Records per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of books", body = PaginatedResponse<BookDetails>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookDetails>>> {
    let (page, per_page) = crate::models::pagination(query.page, query.per_page);
    let (items, total) = state.services.catalog.search_books(&query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page,
        per_page,
    }))
}

/// List books currently available for lending
#[utoipa::path(
    get,
    path = "/books/available",
    tag = "books",
    responses(
        (status = 200, description = "Available books", body = Vec<BookDetails>)
    )
)]
pub async fn list_available_books(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let books = state.services.catalog.list_available_books().await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_staff()?;
    request.validate()?;

    let created = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_staff()?;
    request.validate()?;

    let updated = state.services.catalog.update_book(id, request).await?;
    Ok(Json(updated))
}

/// Delete a book (cascades to its loans)
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lend a book to the calling user
#[utoipa::path(
    post,
    path = "/books/{id}/lend",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Book lent", body = LendResponse),
        (status = 400, description = "Book unavailable"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn lend_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<LendResponse>)> {
    let (loan, title) = state.services.loans.lend(book_id, &claims).await?;

    Ok((
        StatusCode::CREATED,
        Json(LendResponse {
            loan_id: loan.id,
            message: format!("Book \"{}\" lent successfully", title),
            book_title: title,
        }),
    ))
}
