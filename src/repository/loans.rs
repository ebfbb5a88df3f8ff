//! Loans repository for database operations.
//!
//! Lend and return are each a single transaction. The precondition check is
//! folded into a conditional UPDATE whose affected-row count decides the
//! outcome, so two concurrent lends of the same book cannot both pass the
//! availability check.

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails, LoanQuery, LoanRow},
    models::user::UserClaims,
};

const LOAN_COLUMNS: &str = "l.id, l.book_id, b.title AS book_title, l.user_id, \
     u.login AS user_login, l.loan_date, l.return_date, l.returned";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &LoanQuery, caller: &UserClaims) {
    if let Some(returned) = query.returned {
        qb.push(" AND l.returned = ").push_bind(returned);
    }

    // Patrons only ever see their own loans; staff may filter by any user.
    if caller.is_staff() {
        if let Some(user_id) = query.user_id {
            qb.push(" AND l.user_id = ").push_bind(user_id);
        }
    } else {
        qb.push(" AND l.user_id = ").push_bind(caller.user_id);
    }
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a loan visible to the caller
    pub async fn get_visible(&self, id: i32, caller: &UserClaims) -> AppResult<LoanDetails> {
        let row = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans l \
             JOIN books b ON b.id = l.book_id \
             JOIN users u ON u.id = l.user_id \
             WHERE l.id = $1",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        if !caller.is_staff() && row.user_id != caller.user_id {
            // Loans outside the caller's scope are indistinguishable from missing ones
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }

        Ok(row.into())
    }

    /// List loans visible to the caller, most recent first
    pub async fn list(
        &self,
        query: &LoanQuery,
        caller: &UserClaims,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let (page, per_page) = crate::models::pagination(query.page, query.per_page);
        let offset = (page - 1) * per_page;

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loans l WHERE 1=1");
        push_filters(&mut count_qb, query, caller);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM loans l \
             JOIN books b ON b.id = l.book_id \
             JOIN users u ON u.id = l.user_id \
             WHERE 1=1",
            LOAN_COLUMNS
        ));
        push_filters(&mut qb, query, caller);
        qb.push(" ORDER BY l.loan_date DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<LoanRow>().fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Lend a book to a user.
    ///
    /// Flips `available` with a conditional UPDATE and creates the loan in
    /// the same transaction. Exactly one of N concurrent calls on an
    /// available book wins; the rest get `BookUnavailable`.
    pub async fn lend(&self, book_id: i32, user_id: i32) -> AppResult<(Loan, String)> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            "UPDATE books SET available = FALSE WHERE id = $1 AND available = TRUE",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            // Missing book and unavailable book are different client errors
            let title: Option<String> =
                sqlx::query_scalar("SELECT title FROM books WHERE id = $1")
                    .bind(book_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match title {
                Some(_) => Err(AppError::BookUnavailable),
                None => Err(AppError::NotFound(format!(
                    "Book with id {} not found",
                    book_id
                ))),
            };
        }

        let title: String = sqlx::query_scalar("SELECT title FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, user_id, loan_date, returned)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((loan, title))
    }

    /// Return a loan visible to the caller.
    ///
    /// Marks the loan returned with a conditional UPDATE and restores the
    /// book's availability in the same transaction.
    pub async fn return_loan(&self, loan_id: i32, caller: &UserClaims) -> AppResult<LoanDetails> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if !caller.is_staff() && loan.user_id != caller.user_id {
            return Err(AppError::NotFound(format!(
                "Loan with id {} not found",
                loan_id
            )));
        }

        let marked = sqlx::query(
            "UPDATE loans SET returned = TRUE, return_date = $1 WHERE id = $2 AND returned = FALSE",
        )
        .bind(now)
        .bind(loan_id)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            return Err(AppError::AlreadyReturned);
        }

        sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let row = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans l \
             JOIN books b ON b.id = l.book_id \
             JOIN users u ON u.id = l.user_id \
             WHERE l.id = $1",
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete a loan (plain CRUD, staff only at the service layer).
    ///
    /// Deleting an outstanding loan restores the book's availability so the
    /// available-iff-no-outstanding-loan invariant keeps holding.
    pub async fn delete(&self, loan_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(loan_id)
            .execute(&mut *tx)
            .await?;

        if !loan.returned {
            sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
                .bind(loan.book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
