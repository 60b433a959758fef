use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{MatchStatus, TaskStatus};
use crate::catalog::repo_types::Task;

/// Public view of the other participant.
#[derive(Debug, Serialize)]
pub struct PartnerSummary {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
}

/// A match as one of its participants sees it.
#[derive(Debug, Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub status: MatchStatus,
    pub score: i32,
    pub task: Option<Task>,
    pub task_status: TaskStatus,
    pub task_proof_url: Option<String>,
    pub partner: Option<PartnerSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct CreatedMatchResponse {
    #[serde(rename = "match")]
    pub created: MatchView,
    pub score: usize,
    pub shared_trait_ids: Vec<Uuid>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CurrentMatchResponse {
    #[serde(rename = "match")]
    pub current: Option<MatchView>,
}

/// Body of `PATCH /matches/:id`.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub proof_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    #[serde(rename = "match")]
    pub updated: Option<MatchView>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<MatchView>,
}
