use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Gender, ProfileRow, UserProfile};

/// Read access to user identity, gender and traits, plus the one write the
/// profile page needs.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserProfile>>;

    /// Users of `gender` other than `excluding` who are not in a live match.
    /// With `exclude_open_friend_quests`, users with an unfinished friendship
    /// quest are left out as well. Order is stable: oldest account first.
    async fn list_candidates(
        &self,
        gender: Gender,
        excluding: Uuid,
        exclude_open_friend_quests: bool,
    ) -> anyhow::Result<Vec<UserProfile>>;

    /// Replace the user's trait set.
    async fn set_traits(&self, user_id: Uuid, trait_ids: &[Uuid]) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT u.id, u.name, u.age, u.gender,
                   COALESCE(
                       array_agg(ut.trait_id ORDER BY ut.position)
                           FILTER (WHERE ut.trait_id IS NOT NULL),
                       '{}'
                   ) AS trait_ids
              FROM users u
              LEFT JOIN user_traits ut ON ut.user_id = u.id
             WHERE u.id = $1
             GROUP BY u.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get user profile")?;
        Ok(row.map(UserProfile::from))
    }

    async fn list_candidates(
        &self,
        gender: Gender,
        excluding: Uuid,
        exclude_open_friend_quests: bool,
    ) -> anyhow::Result<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT u.id, u.name, u.age, u.gender,
                   COALESCE(
                       array_agg(ut.trait_id ORDER BY ut.position)
                           FILTER (WHERE ut.trait_id IS NOT NULL),
                       '{}'
                   ) AS trait_ids
              FROM users u
              LEFT JOIN user_traits ut ON ut.user_id = u.id
             WHERE u.gender = $1
               AND u.id <> $2
               AND NOT EXISTS (
                   SELECT 1 FROM live_participants lp WHERE lp.user_id = u.id
               )
               AND (NOT $3 OR NOT EXISTS (
                   SELECT 1
                     FROM matches m
                    WHERE m.status = 'friend'
                      AND m.task_status <> 'completed'
                      AND (m.participant_a = u.id OR m.participant_b = u.id)
               ))
             GROUP BY u.id
             ORDER BY u.created_at ASC, u.id ASC
            "#,
        )
        .bind(gender.as_str())
        .bind(excluding)
        .bind(exclude_open_friend_quests)
        .fetch_all(&self.db)
        .await
        .context("list candidates")?;
        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    async fn set_traits(&self, user_id: Uuid, trait_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("DELETE FROM user_traits WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("clear user traits")?;
        sqlx::query(
            r#"
            INSERT INTO user_traits (user_id, trait_id, position)
            SELECT $1, wanted.trait_id, wanted.ord
              FROM unnest($2::uuid[]) WITH ORDINALITY AS wanted(trait_id, ord)
            "#,
        )
        .bind(user_id)
        .bind(trait_ids)
        .execute(&mut *tx)
        .await
        .context("insert user traits")?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }
}
