use rand::Rng;
use uuid::Uuid;

use super::{
    model::{Match, MatchStatus, TaskStatus},
    tasks,
};
use crate::{catalog::repo_types::Task, error::ApiError};

/// A participant's request, with whatever input the action needs.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    RequestFriend,
    AcceptFriend,
    DeclineFriend,
    PartWays,
    StartTask,
    CompleteTask { proof_url: &'a str },
    /// `pool` is the caller's full trait task pool.
    AssignTask { pool: &'a [Task] },
}

/// What applying a command does to the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to write; the command was a repeat.
    Unchanged,
    /// Replace the row with this state.
    Update(Match),
    /// Delete the row.
    Dissolve,
}

/// Compute the effect of `cmd` issued by `caller` on `current`.
///
/// Pure: the caller persists the outcome. Only participants may act.
///
/// `StartTask` on a completed quest is a conflict; the pair has to ask for a
/// new quest with `AssignTask` first. Repeating `StartTask` on an ongoing
/// quest changes nothing.
pub fn transition<R: Rng + ?Sized>(
    current: &Match,
    caller: Uuid,
    cmd: &Command<'_>,
    rng: &mut R,
) -> Result<Outcome, ApiError> {
    if !current.has_participant(caller) {
        return Err(ApiError::Unauthorized(
            "not a participant of this match".into(),
        ));
    }

    let mut next = current.clone();
    match *cmd {
        Command::PartWays => return Ok(Outcome::Dissolve),

        Command::DeclineFriend => {
            return match current.status {
                MatchStatus::FriendRequested { by } if by != caller => Ok(Outcome::Dissolve),
                MatchStatus::FriendRequested { .. } => Err(ApiError::Conflict(
                    "you cannot decline your own friend request".into(),
                )),
                _ => Err(ApiError::Conflict("there is no friend request to decline".into())),
            };
        }

        Command::RequestFriend => match current.status {
            MatchStatus::FriendRequested { by } if by == caller => return Ok(Outcome::Unchanged),
            MatchStatus::FriendRequested { .. } => next.status = MatchStatus::Friend,
            MatchStatus::Live | MatchStatus::Friend => {
                next.status = MatchStatus::FriendRequested { by: caller }
            }
        },

        Command::AcceptFriend => match current.status {
            MatchStatus::FriendRequested { .. } => next.status = MatchStatus::Friend,
            MatchStatus::Friend => return Ok(Outcome::Unchanged),
            MatchStatus::Live => {
                return Err(ApiError::Conflict(
                    "there is no friend request to accept".into(),
                ))
            }
        },

        Command::StartTask => match current.task_status {
            TaskStatus::Pending => next.task_status = TaskStatus::Ongoing,
            TaskStatus::Ongoing => return Ok(Outcome::Unchanged),
            TaskStatus::Completed => {
                return Err(ApiError::Conflict(
                    "this quest is already completed, ask for a new one".into(),
                ))
            }
        },

        Command::CompleteTask { proof_url } => {
            let proof_url = proof_url.trim();
            if proof_url.is_empty() {
                return Err(ApiError::Validation("proof_url is required".into()));
            }
            next.task_status = TaskStatus::Completed;
            next.task_proof_url = Some(proof_url.to_string());
        }

        Command::AssignTask { pool } => {
            let task = tasks::pick_reassignment(pool, current.task_id, rng)
                .ok_or(ApiError::NoTasks)?;
            next.task_id = task.id;
            next.task_status = TaskStatus::Pending;
            next.task_proof_url = None;
        }
    }
    Ok(Outcome::Update(next))
}
