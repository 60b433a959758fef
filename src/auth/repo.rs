use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, age, gender, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, age, gender, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert an account; `None` when the email is already taken.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, age, gender)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, name, age, gender, created_at
            "#,
        )
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.age)
        .bind(new.gender)
        .fetch_one(db)
        .await;
        match res {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
