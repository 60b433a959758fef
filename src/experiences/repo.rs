use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewExperience, TaskExperience};

/// Journal entries participants write about their shared quests.
///
/// Listings are newest first and carry the author's name. Entries go away
/// together with their match.
#[async_trait]
pub trait ExperienceLog: Send + Sync {
    async fn add(&self, new: NewExperience<'_>) -> anyhow::Result<TaskExperience>;

    async fn list_for_match(&self, match_id: Uuid) -> anyhow::Result<Vec<TaskExperience>>;

    /// Everything `user_id` wrote, across all of their matches.
    async fn list_for_author(&self, user_id: Uuid) -> anyhow::Result<Vec<TaskExperience>>;
}

#[derive(Clone)]
pub struct PgExperienceLog {
    db: PgPool,
}

impl PgExperienceLog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ExperienceLog for PgExperienceLog {
    async fn add(&self, new: NewExperience<'_>) -> anyhow::Result<TaskExperience> {
        let row = sqlx::query_as::<_, TaskExperience>(
            r#"
            WITH inserted AS (
                INSERT INTO task_experiences (match_id, user_id, content, proof_url)
                VALUES ($1, $2, $3, $4)
                RETURNING id, match_id, user_id, content, proof_url, created_at
            )
            SELECT i.id, i.match_id, i.user_id, u.name AS author_name,
                   i.content, i.proof_url, i.created_at
              FROM inserted i
              JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(new.match_id)
        .bind(new.user_id)
        .bind(new.content)
        .bind(new.proof_url)
        .fetch_one(&self.db)
        .await
        .context("insert experience")?;
        Ok(row)
    }

    async fn list_for_match(&self, match_id: Uuid) -> anyhow::Result<Vec<TaskExperience>> {
        let rows = sqlx::query_as::<_, TaskExperience>(
            r#"
            SELECT e.id, e.match_id, e.user_id, u.name AS author_name,
                   e.content, e.proof_url, e.created_at
              FROM task_experiences e
              JOIN users u ON u.id = e.user_id
             WHERE e.match_id = $1
             ORDER BY e.created_at DESC, e.id
            "#,
        )
        .bind(match_id)
        .fetch_all(&self.db)
        .await
        .context("list match experiences")?;
        Ok(rows)
    }

    async fn list_for_author(&self, user_id: Uuid) -> anyhow::Result<Vec<TaskExperience>> {
        let rows = sqlx::query_as::<_, TaskExperience>(
            r#"
            SELECT e.id, e.match_id, e.user_id, u.name AS author_name,
                   e.content, e.proof_url, e.created_at
              FROM task_experiences e
              JOIN users u ON u.id = e.user_id
             WHERE e.user_id = $1
             ORDER BY e.created_at DESC, e.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list own experiences")?;
        Ok(rows)
    }
}
