//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Full author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub nationality: String,
}

/// Author query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AuthorQuery {
    /// Filter by nationality (exact match)
    pub nationality: Option<String>,
    /// Free-text search in first and last name
    pub search: Option<String>,
    /// Ordering key: `first_name` or `birth_date`, prefix with `-` for descending
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[validate(length(min = 1, message = "Nationality is required"))]
    pub nationality: String,
}

/// Update author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
}
