//! Book (catalog entry) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book genre classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Fiction,
    NonFiction,
    Fantasy,
    Science,
    History,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "fiction",
            Genre::NonFiction => "non_fiction",
            Genre::Fantasy => "fantasy",
            Genre::Science => "science",
            Genre::History => "history",
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fiction" => Ok(Genre::Fiction),
            "non_fiction" => Ok(Genre::NonFiction),
            "fantasy" => Ok(Genre::Fantasy),
            "science" => Ok(Genre::Science),
            "history" => Ok(Genre::History),
            _ => Err(format!("Invalid genre: {}", s)),
        }
    }
}

// SQLx conversion for Genre (stored as TEXT)
impl sqlx::Type<Postgres> for Genre {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Genre {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Genre {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub genre: Genre,
    pub page_count: i32,
    pub available: bool,
}

/// Short author representation embedded in book listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorSummary {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

/// Internal row structure for book queries joined with authors
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub genre: Genre,
    pub page_count: i32,
    pub available: bool,
    pub author_first_name: String,
    pub author_last_name: String,
}

/// Book with author details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub author: AuthorSummary,
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub genre: Genre,
    pub page_count: i32,
    pub available: bool,
}

impl From<BookRow> for BookDetails {
    fn from(row: BookRow) -> Self {
        BookDetails {
            id: row.id,
            title: row.title,
            author: AuthorSummary {
                id: row.author_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
            },
            isbn: row.isbn,
            publication_date: row.publication_date,
            genre: row.genre,
            page_count: row.page_count,
            available: row.available,
        }
    }
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Filter by genre
    pub genre: Option<Genre>,
    /// Filter by availability
    pub available: Option<bool>,
    /// Filter by author ID
    pub author_id: Option<i32>,
    /// Free-text search in title and author names
    pub search: Option<String>,
    /// Ordering key: `title` or `publication_date`, prefix with `-` for descending
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author_id: i32,
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10 to 13 characters"))]
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub genre: Genre,
    #[validate(range(min = 0, message = "Page count must be non-negative"))]
    pub page_count: i32,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author_id: Option<i32>,
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10 to 13 characters"))]
    pub isbn: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub genre: Option<Genre>,
    #[validate(range(min = 0, message = "Page count must be non-negative"))]
    pub page_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_string_codes_roundtrip() {
        for genre in [
            Genre::Fiction,
            Genre::NonFiction,
            Genre::Fantasy,
            Genre::Science,
            Genre::History,
        ] {
            assert_eq!(genre.as_str().parse::<Genre>().unwrap(), genre);
        }
    }

    #[test]
    fn unknown_genre_is_rejected() {
        assert!("poetry".parse::<Genre>().is_err());
    }

    #[test]
    fn genre_serializes_as_snake_case() {
        let json = serde_json::to_string(&Genre::NonFiction).unwrap();
        assert_eq!(json, "\"non_fiction\"");
    }
}
