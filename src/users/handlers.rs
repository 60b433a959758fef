use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    catalog::repo_types::PersonalityTrait,
    error::ApiError,
    state::AppState,
    users::repo_types::Gender,
};

#[derive(Debug, Deserialize)]
pub struct UpdateTraitsRequest {
    pub trait_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub traits: Vec<PersonalityTrait>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: ProfileView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile).put(update_traits))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = load_view(&state, user_id).await?;
    Ok(Json(ProfileResponse {
        user,
        message: None,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_traits(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateTraitsRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "rejected trait update body");
        ApiError::Validation("trait_ids must be an array of ids".into())
    })?;

    let trait_ids = dedup_in_order(payload.trait_ids);
    let known = state.catalog.find_traits(&trait_ids).await?;
    if known.len() != trait_ids.len() {
        return Err(ApiError::Validation("unknown trait id".into()));
    }

    state.users.set_traits(user_id, &trait_ids).await?;
    info!(%user_id, count = trait_ids.len(), "traits updated");

    let user = load_view(&state, user_id).await?;
    Ok(Json(ProfileResponse {
        user,
        message: Some("profile updated"),
    }))
}

async fn load_view(state: &AppState, user_id: Uuid) -> Result<ProfileView, ApiError> {
    let profile = state
        .users
        .get_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let traits = state.catalog.find_traits(&profile.trait_ids).await?;
    Ok(ProfileView {
        id: profile.id,
        name: profile.name,
        age: profile.age,
        gender: profile.gender,
        traits,
    })
}

fn dedup_in_order(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::memory::MemoryStore;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_in_order(vec![a, b, a, b, a]), vec![a, b]);
    }

    #[tokio::test]
    async fn update_replaces_trait_set() {
        let store = MemoryStore::new();
        let nature = store.add_trait("Nature lover").await;
        let books = store.add_trait("Book lover").await;
        let user = store.add_user("x", Some(Gender::Boy), vec![nature]).await;
        let state = AppState::fake_with(store);

        let Json(res) = update_traits(
            State(state.clone()),
            AuthUser(user),
            Ok(Json(UpdateTraitsRequest {
                trait_ids: vec![books, books],
            })),
        )
        .await
        .unwrap();
        let names: Vec<_> = res.user.traits.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Book lover"]);

        let stored = state.users.get_user(user).await.unwrap().unwrap();
        assert_eq!(stored.trait_ids, vec![books]);
    }

    #[tokio::test]
    async fn unknown_trait_is_rejected() {
        let store = MemoryStore::new();
        let user = store.add_user("x", Some(Gender::Girl), vec![]).await;
        let state = AppState::fake_with(store);

        let err = update_traits(
            State(state),
            AuthUser(user),
            Ok(Json(UpdateTraitsRequest {
                trait_ids: vec![Uuid::new_v4()],
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
