//! Loan workflow service

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails, LoanQuery},
    models::user::UserClaims,
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List loans visible to the caller
    pub async fn list(
        &self,
        query: &LoanQuery,
        caller: &UserClaims,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.loans.list(query, caller).await
    }

    /// Get a single loan visible to the caller
    pub async fn get(&self, loan_id: i32, caller: &UserClaims) -> AppResult<LoanDetails> {
        self.repository.loans.get_visible(loan_id, caller).await
    }

    /// Lend a book to the calling user
    pub async fn lend(&self, book_id: i32, caller: &UserClaims) -> AppResult<(Loan, String)> {
        let (loan, title) = self.repository.loans.lend(book_id, caller.user_id).await?;
        tracing::info!(
            loan_id = loan.id,
            book_id,
            user_id = caller.user_id,
            "book lent"
        );
        Ok((loan, title))
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: i32, caller: &UserClaims) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.return_loan(loan_id, caller).await?;
        tracing::info!(loan_id, book_id = loan.book_id, "book returned");
        Ok(loan)
    }

    /// Delete a loan record (staff only)
    pub async fn delete(&self, loan_id: i32, caller: &UserClaims) -> AppResult<()> {
        caller.require_staff()?;
        self.repository.loans.delete(loan_id).await
    }
}
