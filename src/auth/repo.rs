use crate::auth::repo_types::{NewUser, User};
use sqlx::SqlitePool;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, username, email, mobile, password, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, username, email, mobile, password, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Create a new user with an already hashed password.
    pub async fn create(db: &SqlitePool, new: &NewUser, created_at: i64) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, username, email, mobile, password, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, first_name, last_name, username, email, mobile, password, created_at
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.mobile)
        .bind(&new.password_hash)
        .bind(created_at)
        .fetch_one(db)
        .await
    }

    #[cfg(test)]
    pub async fn count_by_email(db: &SqlitePool, email: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(db)
            .await
    }
}

/// Which unique column an insert collided on, if the error is a UNIQUE violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<UniqueColumn> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    let message = db_err.message();
    if message.contains("users.email") {
        Some(UniqueColumn::Email)
    } else if message.contains("users.username") {
        Some(UniqueColumn::Username)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniqueColumn {
    Email,
    Username,
}
