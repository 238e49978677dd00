/*
 * Responsibility
 * - movies テーブル向け SQLx 操作
 * - title の UNIQUE 違反は RepoError::Conflict として返す
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::repos::error::{RepoError, RepoResult};

#[derive(Debug, Clone, FromRow)]
pub struct MovieRow {
    pub id: i32,
    pub title: String,
    pub release_date: DateTime<Utc>,
}

pub async fn list(db: &PgPool) -> RepoResult<Vec<MovieRow>> {
    let rows = sqlx::query_as::<_, MovieRow>(
        r#"
        SELECT id, title, release_date
        FROM movies
        ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    title: &str,
    release_date: DateTime<Utc>,
) -> RepoResult<MovieRow> {
    let row = sqlx::query_as::<_, MovieRow>(
        r#"
        INSERT INTO movies (title, release_date)
        VALUES ($1, $2)
        RETURNING id, title, release_date
        "#,
    )
    .bind(title)
    .bind(release_date)
    .fetch_one(db)
    .await
    .map_err(RepoError::from_sqlx)?;

    Ok(row)
}

/// `None` fields keep their stored value. Returns `None` for an unknown id.
pub async fn update(
    db: &PgPool,
    id: i32,
    title: Option<&str>,
    release_date: Option<DateTime<Utc>>,
) -> RepoResult<Option<MovieRow>> {
    let row = sqlx::query_as::<_, MovieRow>(
        r#"
        UPDATE movies
        SET
            title = COALESCE($2, title),
            release_date = COALESCE($3, release_date)
        WHERE id = $1
        RETURNING id, title, release_date
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(release_date)
    .fetch_optional(db)
    .await
    .map_err(RepoError::from_sqlx)?;

    Ok(row)
}

pub async fn delete(db: &PgPool, id: i32) -> RepoResult<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM movies
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
