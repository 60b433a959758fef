use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use super::{
    machine::Outcome,
    model::{Match, MatchRow, NewMatch, LIVE_STATUSES},
};
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A participant already holds another live match.
    #[error("a participant already holds a live match")]
    Conflict,

    /// The row changed (or vanished) since it was read.
    #[error("match was modified concurrently")]
    Stale,

    #[error("corrupt match row: {0:#}")]
    Corrupt(anyhow::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => {
                ApiError::Conflict("a participant already has another live match".into())
            }
            StoreError::Stale => {
                ApiError::Conflict("the match changed while you were acting on it, retry".into())
            }
            StoreError::Corrupt(e) => ApiError::Internal(e),
            StoreError::Database(e) => ApiError::Internal(e.into()),
        }
    }
}

/// Persistence for matches.
///
/// Implementations guarantee that a user is a participant of at most one
/// live match: `create` and any `commit` that leaves a match live fail with
/// [`StoreError::Conflict`] instead of breaking that rule.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert a live match with a pending quest.
    async fn create(&self, new: NewMatch) -> Result<Match, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Match>, StoreError>;

    /// The live match `user_id` takes part in, if any.
    async fn find_live(&self, user_id: Uuid) -> Result<Option<Match>, StoreError>;

    /// A live match, or failing that the most recently touched friendship
    /// whose quest is still open.
    async fn find_current(&self, user_id: Uuid) -> Result<Option<Match>, StoreError>;

    /// Friendships of `user_id`, most recently updated first.
    async fn list_friends(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError>;

    /// Persist `outcome`, computed from `snapshot`. Fails with
    /// [`StoreError::Stale`] when the stored row no longer has the snapshot's
    /// version. Returns the stored match, or `None` once dissolved.
    async fn commit(&self, snapshot: &Match, outcome: Outcome) -> Result<Option<Match>, StoreError>;
}

#[derive(Clone)]
pub struct PgMatchStore {
    db: PgPool,
}

impl PgMatchStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_match(row: MatchRow) -> Result<Match, StoreError> {
    Match::try_from(row).map_err(StoreError::Corrupt)
}

/// Register both participants as holders of a live match.
async fn claim_live_slots(
    tx: &mut Transaction<'_, Postgres>,
    m: &Match,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM live_participants WHERE match_id = $1")
        .bind(m.id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO live_participants (user_id, match_id)
        VALUES ($1, $3), ($2, $3)
        "#,
    )
    .bind(m.participant_a)
    .bind(m.participant_b)
    .bind(m.id)
    .execute(&mut **tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    })?;
    Ok(())
}

async fn release_live_slots(
    tx: &mut Transaction<'_, Postgres>,
    match_id: Uuid,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM live_participants WHERE match_id = $1")
        .bind(match_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn create(&self, new: NewMatch) -> Result<Match, StoreError> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            INSERT INTO matches (participant_a, participant_b, status, score, task_id, task_status)
            VALUES ($1, $2, 'live', $3, $4, 'pending')
            RETURNING id, participant_a, participant_b, status, requested_by, score,
                      task_id, task_status, task_proof_url, version, created_at, updated_at
            "#,
        )
        .bind(new.participant_a)
        .bind(new.participant_b)
        .bind(new.score)
        .bind(new.task_id)
        .fetch_one(&mut *tx)
        .await?;
        let created = into_match(row)?;
        claim_live_slots(&mut tx, &created).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Match>, StoreError> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, participant_a, participant_b, status, requested_by, score,
                   task_id, task_status, task_proof_url, version, created_at, updated_at
              FROM matches
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_match).transpose()
    }

    async fn find_live(&self, user_id: Uuid) -> Result<Option<Match>, StoreError> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, participant_a, participant_b, status, requested_by, score,
                   task_id, task_status, task_proof_url, version, created_at, updated_at
              FROM matches
             WHERE (participant_a = $1 OR participant_b = $1)
               AND status = ANY($2)
             ORDER BY updated_at DESC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(&LIVE_STATUSES[..])
        .fetch_optional(&self.db)
        .await?;
        row.map(into_match).transpose()
    }

    async fn find_current(&self, user_id: Uuid) -> Result<Option<Match>, StoreError> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, participant_a, participant_b, status, requested_by, score,
                   task_id, task_status, task_proof_url, version, created_at, updated_at
              FROM matches
             WHERE (participant_a = $1 OR participant_b = $1)
               AND (status = ANY($2) OR (status = 'friend' AND task_status <> 'completed'))
             ORDER BY (status = ANY($2)) DESC, updated_at DESC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(&LIVE_STATUSES[..])
        .fetch_optional(&self.db)
        .await?;
        row.map(into_match).transpose()
    }

    async fn list_friends(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, participant_a, participant_b, status, requested_by, score,
                   task_id, task_status, task_proof_url, version, created_at, updated_at
              FROM matches
             WHERE (participant_a = $1 OR participant_b = $1)
               AND status = 'friend'
             ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(into_match).collect()
    }

    async fn commit(
        &self,
        snapshot: &Match,
        outcome: Outcome,
    ) -> Result<Option<Match>, StoreError> {
        match outcome {
            Outcome::Unchanged => Ok(Some(snapshot.clone())),

            Outcome::Dissolve => {
                let done = sqlx::query("DELETE FROM matches WHERE id = $1 AND version = $2")
                    .bind(snapshot.id)
                    .bind(snapshot.version)
                    .execute(&self.db)
                    .await?;
                if done.rows_affected() == 0 {
                    return Err(StoreError::Stale);
                }
                Ok(None)
            }

            Outcome::Update(next) => {
                let mut tx = self.db.begin().await?;
                let row = sqlx::query_as::<_, MatchRow>(
                    r#"
                    UPDATE matches
                       SET status = $3,
                           requested_by = $4,
                           task_id = $5,
                           task_status = $6,
                           task_proof_url = $7,
                           version = version + 1,
                           updated_at = now()
                     WHERE id = $1 AND version = $2
                    RETURNING id, participant_a, participant_b, status, requested_by, score,
                              task_id, task_status, task_proof_url, version, created_at, updated_at
                    "#,
                )
                .bind(snapshot.id)
                .bind(snapshot.version)
                .bind(next.status.db_name())
                .bind(next.status.requested_by())
                .bind(next.task_id)
                .bind(next.task_status.as_str())
                .bind(next.task_proof_url.as_deref())
                .fetch_optional(&mut *tx)
                .await?;
                let Some(row) = row else {
                    return Err(StoreError::Stale);
                };
                let stored = into_match(row)?;
                if stored.is_live() {
                    claim_live_slots(&mut tx, &stored).await?;
                } else {
                    release_live_slots(&mut tx, stored.id).await?;
                }
                tx.commit().await?;
                Ok(Some(stored))
            }
        }
    }
}
