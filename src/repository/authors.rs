//! Authors repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
};

/// Map an ordering key to a whitelisted ORDER BY clause.
/// A leading `-` requests descending order.
fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering {
        Some("first_name") => "first_name ASC",
        Some("-first_name") => "first_name DESC",
        Some("birth_date") => "birth_date ASC",
        Some("-birth_date") => "birth_date DESC",
        _ => "last_name ASC, first_name ASC",
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AuthorQuery) {
    if let Some(ref nationality) = query.nationality {
        qb.push(" AND nationality = ").push_bind(nationality.clone());
    }

    if let Some(ref search) = query.search {
        let term = format!("%{}%", search.to_lowercase());
        qb.push(" AND (LOWER(first_name) LIKE ")
            .push_bind(term.clone())
            .push(" OR LOWER(last_name) LIKE ")
            .push_bind(term)
            .push(")");
    }
}

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get author by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Search authors with filters and pagination
    pub async fn search(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        let (page, per_page) = crate::models::pagination(query.page, query.per_page);
        let offset = (page - 1) * per_page;

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM authors WHERE 1=1");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM authors WHERE 1=1");
        push_filters(&mut qb, query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref()))
            .push(" LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let authors = qb
            .build_query_as::<Author>()
            .fetch_all(&self.pool)
            .await?;

        Ok((authors, total))
    }

    /// Create a new author
    pub async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let created = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name, birth_date, nationality)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing author
    pub async fn update(&self, id: i32, update: &UpdateAuthor) -> AppResult<Author> {
        let existing = self.get_by_id(id).await?;

        let updated = sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET first_name = $1, last_name = $2, birth_date = $3, nationality = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(update.first_name.as_ref().unwrap_or(&existing.first_name))
        .bind(update.last_name.as_ref().unwrap_or(&existing.last_name))
        .bind(update.birth_date.unwrap_or(existing.birth_date))
        .bind(update.nationality.as_ref().unwrap_or(&existing.nationality))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete an author. Books and their loans are removed by cascade.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Author with id {} not found",
                id
            )));
        }

        Ok(())
    }
}
