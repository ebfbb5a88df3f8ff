//! Users repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::user::{AccountType, User, UserQuery},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by login (primary authentication method)
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(login) = LOWER($1)")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Check if login already exists
    pub async fn login_exists(&self, login: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(login) = LOWER($1))")
                .bind(login)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// List users with optional search and pagination
    pub async fn list(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let (page, per_page) = crate::models::pagination(query.page, query.per_page);
        let offset = (page - 1) * per_page;

        let push_search = |qb: &mut QueryBuilder<'_, Postgres>| {
            if let Some(ref search) = query.search {
                let term = format!("%{}%", search.to_lowercase());
                qb.push(" AND (LOWER(login) LIKE ")
                    .push_bind(term.clone())
                    .push(" OR LOWER(first_name) LIKE ")
                    .push_bind(term.clone())
                    .push(" OR LOWER(last_name) LIKE ")
                    .push_bind(term)
                    .push(")");
            }
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE 1=1");
        push_search(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE 1=1");
        push_search(&mut qb);
        qb.push(" ORDER BY login ASC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user with an already-hashed password
    pub async fn create(
        &self,
        login: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
        account_type: AccountType,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password, first_name, last_name, email, account_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(account_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Delete a user. Their loans are removed by cascade; books held by
    /// outstanding loans are made available again in the same transaction,
    /// since no loan survives to return them.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE books SET available = TRUE \
             WHERE id IN (SELECT book_id FROM loans WHERE user_id = $1 AND returned = FALSE)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tx.commit().await?;

        Ok(())
    }
}
