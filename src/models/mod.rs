//! Data models for Biblioteca

pub mod author;
pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails, Genre};
pub use loan::{Loan, LoanDetails};
pub use user::{AccountType, User, UserClaims};

/// Normalize raw page/per_page query values into the effective pagination
/// window. Listing responses echo exactly these values.
pub fn pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    (page.unwrap_or(1).max(1), per_page.unwrap_or(20).clamp(1, 100))
}

#[cfg(test)]
mod tests {
    use super::pagination;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        assert_eq!(pagination(None, None), (1, 20));
        assert_eq!(pagination(Some(0), Some(500)), (1, 100));
        assert_eq!(pagination(Some(-3), Some(0)), (1, 1));
        assert_eq!(pagination(Some(4), Some(50)), (4, 50));
    }
}
