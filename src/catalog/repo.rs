use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{PersonalityTrait, Task};

/// Read-only lookup over the static trait/task catalog.
#[async_trait]
pub trait TraitCatalog: Send + Sync {
    /// All traits ordered by name.
    async fn list_traits(&self) -> anyhow::Result<Vec<PersonalityTrait>>;

    /// The subset of `ids` that exist, in name order.
    async fn find_traits(&self, ids: &[Uuid]) -> anyhow::Result<Vec<PersonalityTrait>>;

    /// Tasks linked to `trait_ids`, flattened in the order the ids are given.
    /// A repeated trait id yields its tasks again.
    async fn tasks_for_traits(&self, trait_ids: &[Uuid]) -> anyhow::Result<Vec<Task>>;

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>>;
}

#[derive(Clone)]
pub struct PgTraitCatalog {
    db: PgPool,
}

impl PgTraitCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TraitCatalog for PgTraitCatalog {
    async fn list_traits(&self) -> anyhow::Result<Vec<PersonalityTrait>> {
        let rows = sqlx::query_as::<_, PersonalityTrait>(
            r#"
            SELECT id, name
              FROM personality_traits
             ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list traits")?;
        Ok(rows)
    }

    async fn find_traits(&self, ids: &[Uuid]) -> anyhow::Result<Vec<PersonalityTrait>> {
        let rows = sqlx::query_as::<_, PersonalityTrait>(
            r#"
            SELECT id, name
              FROM personality_traits
             WHERE id = ANY($1)
             ORDER BY name ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find traits")?;
        Ok(rows)
    }

    async fn tasks_for_traits(&self, trait_ids: &[Uuid]) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.title, t.description, t.category, t.difficulty, t.trait_id
              FROM unnest($1::uuid[]) WITH ORDINALITY AS wanted(trait_id, ord)
              JOIN tasks t ON t.trait_id = wanted.trait_id
             ORDER BY wanted.ord ASC, t.title ASC
            "#,
        )
        .bind(trait_ids)
        .fetch_all(&self.db)
        .await
        .context("tasks for traits")?;
        Ok(rows)
    }

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, category, difficulty, trait_id
              FROM tasks
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get task")?;
        Ok(row)
    }
}
