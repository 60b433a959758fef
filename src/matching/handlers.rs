use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        ActionRequest, ActionResponse, CreatedMatchResponse, CurrentMatchResponse,
        FriendsResponse,
    },
    model::MatchAction,
    services,
};
use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState};

pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/matches", post(create_match))
        .route("/matches/current", get(current_match))
        .route("/matches/:id", patch(apply_action))
        .route("/friends", get(list_friends))
}

#[instrument(skip(state))]
pub async fn create_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, Json<CreatedMatchResponse>), ApiError> {
    let mut rng = StdRng::from_entropy();
    let created = services::create_match(&state, user_id, &mut rng).await?;
    let view = services::render(&state, created.created, user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedMatchResponse {
            created: view,
            score: created.compatibility.score,
            shared_trait_ids: created.compatibility.shared,
            message: "match created",
        }),
    ))
}

#[instrument(skip(state))]
pub async fn current_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CurrentMatchResponse>, ApiError> {
    let current = match services::current_match(&state, user_id).await? {
        Some(m) => Some(services::render(&state, m, user_id).await?),
        None => None,
    };
    Ok(Json(CurrentMatchResponse { current }))
}

#[instrument(skip(state, payload))]
pub async fn apply_action(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(match_id): Path<Uuid>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "rejected match action body");
        ApiError::Validation("body must be {\"action\": string, \"proof_url\"?: string}".into())
    })?;
    let action: MatchAction = body.action.parse()?;

    let mut rng = StdRng::from_entropy();
    let outcome = services::apply_action(
        &state,
        match_id,
        user_id,
        action,
        body.proof_url.as_deref(),
        &mut rng,
    )
    .await?;

    let updated = match outcome.stored {
        Some(m) => Some(services::render(&state, m, user_id).await?),
        None => None,
    };
    Ok(Json(ActionResponse {
        updated,
        message: outcome.message,
    }))
}

#[instrument(skip(state))]
pub async fn list_friends(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<FriendsResponse>, ApiError> {
    let matches = services::list_friends(&state, user_id).await?;
    let mut friends = Vec::with_capacity(matches.len());
    for m in matches {
        friends.push(services::render(&state, m, user_id).await?);
    }
    Ok(Json(FriendsResponse { friends }))
}
