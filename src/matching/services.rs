use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{MatchView, PartnerSummary},
    machine::{self, Command, Outcome},
    model::{Match, MatchAction, NewMatch},
    scorer::Compatibility,
    selector::find_compatible_match,
    store::StoreError,
    tasks,
};
use crate::{catalog::repo_types::Task, error::ApiError, state::AppState};

/// A newly created match with the compatibility that produced it.
#[derive(Debug, Clone)]
pub struct CreatedMatch {
    pub created: Match,
    pub compatibility: Compatibility,
}

/// Result of a participant action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// `None` once the match has been dissolved.
    pub stored: Option<Match>,
    pub message: &'static str,
}

/// The match that keeps `user_id` from being paired again, under the
/// configured policy.
async fn blocking_match(state: &AppState, user_id: Uuid) -> Result<Option<Match>, ApiError> {
    let exclusive = state.config.matching.friend_quests_block_matching;
    let found = if exclusive {
        state.matches.find_current(user_id).await?
    } else {
        state.matches.find_live(user_id).await?
    };
    Ok(found.filter(|m| m.blocks_new_match(exclusive)))
}

/// Pair `requester_id` with their most compatible available counterpart.
pub async fn create_match<R: Rng + Send>(
    state: &AppState,
    requester_id: Uuid,
    rng: &mut R,
) -> Result<CreatedMatch, ApiError> {
    let policy = &state.config.matching;

    let requester = state
        .users
        .get_user(requester_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if blocking_match(state, requester_id).await?.is_some() {
        return Err(ApiError::AlreadyMatched);
    }
    if requester.trait_ids.is_empty() {
        return Err(ApiError::NoTraits);
    }
    if state.rule.counterpart(requester.gender).is_none() {
        return Err(ApiError::InvalidGender);
    }

    for attempt in 1..=policy.create_attempts {
        let Some(found) = find_compatible_match(
            state.users.as_ref(),
            state.rule.as_ref(),
            &requester,
            policy.friend_quests_block_matching,
        )
        .await?
        else {
            return Err(ApiError::NoCandidates);
        };

        let pool = state
            .catalog
            .tasks_for_traits(&found.compatibility.shared)
            .await?;
        let task = tasks::pick_initial(&pool, rng).ok_or(ApiError::NoTasks)?;

        let new = NewMatch {
            participant_a: requester.id,
            participant_b: found.candidate.id,
            score: found.compatibility.score as i32,
            task_id: task.id,
        };
        match state.matches.create(new).await {
            Ok(created) => {
                info!(
                    match_id = %created.id,
                    requester = %requester.id,
                    partner = %found.candidate.id,
                    score = found.compatibility.score,
                    task_id = %created.task_id,
                    "match created"
                );
                return Ok(CreatedMatch {
                    created,
                    compatibility: found.compatibility,
                });
            }
            Err(StoreError::Conflict) => {
                if state.matches.find_live(requester_id).await?.is_some() {
                    return Err(ApiError::AlreadyMatched);
                }
                warn!(
                    attempt,
                    requester = %requester.id,
                    candidate = %found.candidate.id,
                    "candidate was claimed concurrently, selecting again"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::NoCandidates)
}

pub async fn current_match(state: &AppState, user_id: Uuid) -> Result<Option<Match>, ApiError> {
    Ok(state.matches.find_current(user_id).await?)
}

pub async fn list_friends(state: &AppState, user_id: Uuid) -> Result<Vec<Match>, ApiError> {
    Ok(state.matches.list_friends(user_id).await?)
}

/// Every task reachable from the caller's traits.
async fn task_pool_for(state: &AppState, user_id: Uuid) -> Result<Vec<Task>, ApiError> {
    let user = state
        .users
        .get_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let pool = state.catalog.tasks_for_traits(&user.trait_ids).await?;
    if pool.is_empty() {
        return Err(ApiError::NoTasks);
    }
    Ok(pool)
}

/// Apply `action` on behalf of `caller`, retrying when the row moved under us.
pub async fn apply_action<R: Rng + Send>(
    state: &AppState,
    match_id: Uuid,
    caller: Uuid,
    action: MatchAction,
    proof_url: Option<&str>,
    rng: &mut R,
) -> Result<ActionOutcome, ApiError> {
    let attempts = state.config.matching.transition_attempts;
    let mut pool: Option<Vec<Task>> = None;

    for attempt in 1..=attempts {
        let current = state
            .matches
            .get(match_id)
            .await?
            .ok_or(ApiError::NotFound("match"))?;
        if !current.has_participant(caller) {
            return Err(ApiError::Unauthorized(
                "not a participant of this match".into(),
            ));
        }
        if action == MatchAction::AssignTask && pool.is_none() {
            pool = Some(task_pool_for(state, caller).await?);
        }

        let cmd = match action {
            MatchAction::RequestFriend => Command::RequestFriend,
            MatchAction::AcceptFriend => Command::AcceptFriend,
            MatchAction::DeclineFriend => Command::DeclineFriend,
            MatchAction::PartWays => Command::PartWays,
            MatchAction::StartTask => Command::StartTask,
            MatchAction::CompleteTask => Command::CompleteTask {
                proof_url: proof_url.unwrap_or_default(),
            },
            MatchAction::AssignTask => Command::AssignTask {
                pool: pool.as_deref().unwrap_or_default(),
            },
        };
        let outcome = machine::transition(&current, caller, &cmd, rng)?;
        if let Outcome::Update(next) = &outcome {
            ensure_exclusive(state, &current, next).await?;
        }

        match state.matches.commit(&current, outcome).await {
            Ok(stored) => {
                match &stored {
                    Some(m) => info!(
                        %match_id,
                        %caller,
                        action = %action,
                        status = m.status.db_name(),
                        task_status = m.task_status.as_str(),
                        "match updated"
                    ),
                    None => info!(%match_id, %caller, action = %action, "match dissolved"),
                }
                let message = message_for(action, stored.as_ref());
                return Ok(ActionOutcome { stored, message });
            }
            Err(StoreError::Stale) => {
                warn!(attempt, %match_id, action = %action, "match changed concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::Stale.into())
}

/// Under the exclusive policy a match that starts blocking again (a finished
/// friendship getting a new quest, or reopening a friend request) must not
/// leave either participant with a second blocking match.
async fn ensure_exclusive(state: &AppState, before: &Match, after: &Match) -> Result<(), ApiError> {
    let exclusive = state.config.matching.friend_quests_block_matching;
    if !exclusive || before.blocks_new_match(exclusive) || !after.blocks_new_match(exclusive) {
        return Ok(());
    }
    for participant in [after.participant_a, after.participant_b] {
        if let Some(other) = state.matches.find_current(participant).await? {
            if other.id != after.id {
                warn!(
                    match_id = %after.id,
                    %participant,
                    other = %other.id,
                    "participant is busy elsewhere"
                );
                return Err(ApiError::Conflict(
                    "a participant already has another ongoing match".into(),
                ));
            }
        }
    }
    Ok(())
}

fn message_for(action: MatchAction, stored: Option<&Match>) -> &'static str {
    use super::model::MatchStatus;

    match (action, stored) {
        (_, None) => "connection severed",
        (MatchAction::RequestFriend, Some(m)) if m.status == MatchStatus::Friend => {
            "mutual connection, added to your friends"
        }
        (MatchAction::RequestFriend, _) => "friend request sent, waiting for your match",
        (MatchAction::AcceptFriend, _) => "friendship finalized",
        (MatchAction::StartTask, _) => "quest started",
        (MatchAction::CompleteTask, _) => "quest complete",
        (MatchAction::AssignTask, _) => "new shared quest assigned",
        (MatchAction::DeclineFriend | MatchAction::PartWays, Some(_)) => "connection severed",
    }
}

/// Shape `m` for `viewer`: resolves the task and the other participant.
pub async fn render(state: &AppState, m: Match, viewer: Uuid) -> Result<MatchView, ApiError> {
    let task = state.catalog.get_task(m.task_id).await?;
    let partner = match m.partner_of(viewer) {
        Some(id) => state
            .users
            .get_user(id)
            .await?
            .map(|u| PartnerSummary {
                id: u.id,
                name: u.name,
                age: u.age,
            }),
        None => None,
    };
    Ok(MatchView {
        id: m.id,
        status: m.status,
        score: m.score,
        task,
        task_status: m.task_status,
        task_proof_url: m.task_proof_url,
        partner,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}
