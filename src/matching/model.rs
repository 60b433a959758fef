use std::{fmt, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

/// Relationship state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MatchStatus {
    /// Freshly paired, neither side has asked for friendship.
    Live,
    /// One participant asked to become friends and waits for the other.
    FriendRequested { by: Uuid },
    /// Both agreed; the match is now a persistent friendship.
    Friend,
}

/// Database spellings of the live states.
pub const LIVE_STATUSES: [&str; 2] = ["live", "friend_requested"];

impl MatchStatus {
    /// Live matches hold both participants: nobody in one may be paired again.
    pub fn is_live(&self) -> bool {
        matches!(self, MatchStatus::Live | MatchStatus::FriendRequested { .. })
    }

    pub fn db_name(&self) -> &'static str {
        match self {
            MatchStatus::Live => "live",
            MatchStatus::FriendRequested { .. } => "friend_requested",
            MatchStatus::Friend => "friend",
        }
    }

    pub fn requested_by(&self) -> Option<Uuid> {
        match self {
            MatchStatus::FriendRequested { by } => Some(*by),
            _ => None,
        }
    }

    pub fn from_db(status: &str, requested_by: Option<Uuid>) -> anyhow::Result<Self> {
        match (status, requested_by) {
            ("live", None) => Ok(MatchStatus::Live),
            ("friend_requested", Some(by)) => Ok(MatchStatus::FriendRequested { by }),
            ("friend", None) => Ok(MatchStatus::Friend),
            (other, by) => {
                anyhow::bail!("inconsistent match status {other:?} (requested_by={by:?})")
            }
        }
    }
}

/// Progress of the quest attached to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Ongoing,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ongoing => "ongoing",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "ongoing" => Ok(TaskStatus::Ongoing),
            "completed" => Ok(TaskStatus::Completed),
            other => anyhow::bail!("unknown task status {other:?}"),
        }
    }
}

/// Two users paired around a shared quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub status: MatchStatus,
    /// Number of traits the participants shared when they were paired.
    pub score: i32,
    pub task_id: Uuid,
    pub task_status: TaskStatus,
    pub task_proof_url: Option<String>,
    #[serde(skip)]
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Match {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    pub fn partner_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_a == user_id {
            Some(self.participant_b)
        } else if self.participant_b == user_id {
            Some(self.participant_a)
        } else {
            None
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// What a participant should see as "my match right now": anything live,
    /// or a friendship whose quest is still open.
    pub fn is_current(&self) -> bool {
        self.is_live()
            || (self.status == MatchStatus::Friend && self.task_status != TaskStatus::Completed)
    }

    /// Whether this match keeps its participants out of new pairings.
    pub fn blocks_new_match(&self, friend_quests_block: bool) -> bool {
        if friend_quests_block {
            self.is_current()
        } else {
            self.is_live()
        }
    }
}

/// Input for inserting a freshly selected pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub score: i32,
    pub task_id: Uuid,
}

#[derive(Debug, FromRow)]
pub struct MatchRow {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub status: String,
    pub requested_by: Option<Uuid>,
    pub score: i32,
    pub task_id: Uuid,
    pub task_status: String,
    pub task_proof_url: Option<String>,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<MatchRow> for Match {
    type Error = anyhow::Error;

    fn try_from(r: MatchRow) -> Result<Self, Self::Error> {
        let status = MatchStatus::from_db(&r.status, r.requested_by)
            .with_context(|| format!("match {}", r.id))?;
        let task_status = r
            .task_status
            .parse()
            .with_context(|| format!("match {}", r.id))?;
        Ok(Self {
            id: r.id,
            participant_a: r.participant_a,
            participant_b: r.participant_b,
            status,
            score: r.score,
            task_id: r.task_id,
            task_status,
            task_proof_url: r.task_proof_url,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Operations a participant can request on an existing match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    RequestFriend,
    AcceptFriend,
    DeclineFriend,
    PartWays,
    StartTask,
    CompleteTask,
    AssignTask,
}

impl MatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchAction::RequestFriend => "request_friend",
            MatchAction::AcceptFriend => "accept_friend",
            MatchAction::DeclineFriend => "decline_friend",
            MatchAction::PartWays => "part_ways",
            MatchAction::StartTask => "start_task",
            MatchAction::CompleteTask => "complete_task",
            MatchAction::AssignTask => "assign_task",
        }
    }
}

impl fmt::Display for MatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request_friend" => Ok(MatchAction::RequestFriend),
            "accept_friend" => Ok(MatchAction::AcceptFriend),
            "decline_friend" => Ok(MatchAction::DeclineFriend),
            "part_ways" => Ok(MatchAction::PartWays),
            "start_task" => Ok(MatchAction::StartTask),
            "complete_task" => Ok(MatchAction::CompleteTask),
            "assign_task" => Ok(MatchAction::AssignTask),
            other => Err(ApiError::InvalidAction(other.to_string())),
        }
    }
}
