use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A participant's note about the quest they shared.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskExperience {
    pub id: Uuid,
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub proof_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Input for a new journal entry; `content` is already trimmed.
#[derive(Debug, Clone, Copy)]
pub struct NewExperience<'a> {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub content: &'a str,
    pub proof_url: Option<&'a str>,
}
