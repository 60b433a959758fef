use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    catalog::repo_types::{PersonalityTrait, Task},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct TraitsResponse {
    pub traits: Vec<PersonalityTrait>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/traits", get(list_traits))
        .route("/tasks", get(recommended_tasks))
}

#[instrument(skip(state))]
pub async fn list_traits(State(state): State<AppState>) -> Result<Json<TraitsResponse>, ApiError> {
    let traits = state.catalog.list_traits().await?;
    Ok(Json(TraitsResponse { traits }))
}

/// Every task reachable from the caller's declared traits.
#[instrument(skip(state))]
pub async fn recommended_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TasksResponse>, ApiError> {
    let user = state
        .users
        .get_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let tasks = state.catalog.tasks_for_traits(&user.trait_ids).await?;
    Ok(Json(TasksResponse { tasks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::memory::MemoryStore;

    #[tokio::test]
    async fn recommended_tasks_follow_declared_traits() {
        let store = MemoryStore::new();
        let nature = store.add_trait("Nature lover").await;
        let books = store.add_trait("Book lover").await;
        store.add_task(nature, "Nature Walk").await;
        store.add_task(books, "Library Visit").await;
        let user = store
            .add_user("x", Some(crate::users::repo_types::Gender::Boy), vec![books])
            .await;
        let state = AppState::fake_with(store);

        let Json(res) = recommended_tasks(State(state), AuthUser(user)).await.unwrap();
        let titles: Vec<_> = res.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Library Visit"]);
    }

    #[tokio::test]
    async fn traits_are_listed_by_name() {
        let store = MemoryStore::new();
        store.add_trait("Nature lover").await;
        store.add_trait("Book lover").await;
        let state = AppState::fake_with(store);

        let Json(res) = list_traits(State(state)).await.unwrap();
        let names: Vec<_> = res.traits.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Book lover", "Nature lover"]);
    }
}
