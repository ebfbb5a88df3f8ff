//! Loan (borrow transaction) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub returned: bool,
}

/// Internal row structure for loan queries joined with books and users
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub user_id: i32,
    pub user_login: String,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub returned: bool,
}

/// Loan with book and borrower details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub user_id: i32,
    pub user_login: String,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub returned: bool,
}

impl From<LoanRow> for LoanDetails {
    fn from(row: LoanRow) -> Self {
        LoanDetails {
            id: row.id,
            book_id: row.book_id,
            book_title: row.book_title,
            user_id: row.user_id,
            user_login: row.user_login,
            loan_date: row.loan_date,
            return_date: row.return_date,
            returned: row.returned,
        }
    }
}

/// Loan query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// Filter by returned flag
    pub returned: Option<bool>,
    /// Filter by borrowing user (staff only; patrons are always scoped to themselves)
    pub user_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
