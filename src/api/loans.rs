//! Loan endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{LoanDetails, LoanQuery},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Return confirmation payload
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Status message
    pub message: String,
    /// Updated loan details
    pub loan: LoanDetails,
}

/// List loans visible to the caller
///
/// Staff see all loans; patrons only their own.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("returned" = Option<bool>, Query, description = "Filter by returned flag"),
        ("user_id" = Option<i32>, Query, description = "Filter by borrowing user (staff only)"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Records per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of loans", body = PaginatedResponse<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    let (page, per_page) = crate::models::pagination(query.page, query.per_page);
    let (items, total) = state.services.loans.list(&query, &claims).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page,
        per_page,
    }))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found or not visible to the caller")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(id, &claims).await?;
    Ok(Json(loan))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 400, description = "Already returned"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.return_loan(loan_id, &claims).await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        loan,
    }))
}

/// Delete a loan record (staff only)
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.loans.delete(id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
