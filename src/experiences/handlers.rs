use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{NewExperience, TaskExperience};
use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct NewExperienceRequest {
    pub content: String,
    #[serde(default)]
    pub proof_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExperienceResponse {
    pub experience: TaskExperience,
}

#[derive(Debug, Serialize)]
pub struct ExperiencesResponse {
    pub experiences: Vec<TaskExperience>,
}

pub fn experience_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/matches/:id/experiences",
            get(list_experiences).post(add_experience),
        )
        .route("/experiences", get(list_own_experiences))
}

/// Only the two participants may read or write a match's journal.
async fn ensure_participant(
    state: &AppState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let m = state
        .matches
        .get(match_id)
        .await?
        .ok_or(ApiError::NotFound("match"))?;
    if !m.has_participant(user_id) {
        return Err(ApiError::Unauthorized(
            "not a participant of this match".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn add_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(match_id): Path<Uuid>,
    payload: Result<Json<NewExperienceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExperienceResponse>), ApiError> {
    ensure_participant(&state, match_id, user_id).await?;

    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "rejected experience body");
        ApiError::Validation("content is required".into())
    })?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("content is required".into()));
    }
    let proof_url = body
        .proof_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    let experience = state
        .experiences
        .add(NewExperience {
            match_id,
            user_id,
            content,
            proof_url,
        })
        .await?;
    info!(experience_id = %experience.id, match_id = %match_id, "experience recorded");
    Ok((StatusCode::CREATED, Json(ExperienceResponse { experience })))
}

#[instrument(skip(state))]
pub async fn list_experiences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<ExperiencesResponse>, ApiError> {
    ensure_participant(&state, match_id, user_id).await?;
    let experiences = state.experiences.list_for_match(match_id).await?;
    Ok(Json(ExperiencesResponse { experiences }))
}

/// The caller's own entries across every match they wrote in.
#[instrument(skip(state))]
pub async fn list_own_experiences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ExperiencesResponse>, ApiError> {
    let experiences = state.experiences.list_for_author(user_id).await?;
    Ok(Json(ExperiencesResponse { experiences }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matching::{memory::MemoryStore, model::MatchAction, model::NewMatch, services},
        users::repo_types::Gender,
    };
    use rand::{rngs::StdRng, SeedableRng};

    struct Journal {
        store: MemoryStore,
        state: AppState,
        match_id: Uuid,
        ann: Uuid,
        ben: Uuid,
        task: Uuid,
    }

    async fn seeded() -> Journal {
        let store = MemoryStore::new();
        let t = store.add_trait("Bookworm").await;
        let task = store.add_task(t, "Book Club").await;
        let ann = store.add_user("Ann", Some(Gender::Girl), vec![t]).await;
        let ben = store.add_user("Ben", Some(Gender::Boy), vec![t]).await;
        let state = AppState::fake_with(store.clone());
        let m = state
            .matches
            .create(NewMatch {
                participant_a: ann,
                participant_b: ben,
                score: 1,
                task_id: task,
            })
            .await
            .unwrap();
        Journal {
            store,
            state,
            match_id: m.id,
            ann,
            ben,
            task,
        }
    }

    fn body(content: &str) -> Result<Json<NewExperienceRequest>, JsonRejection> {
        Ok(Json(NewExperienceRequest {
            content: content.into(),
            proof_url: None,
        }))
    }

    async fn write(j: &Journal, author: Uuid, match_id: Uuid, content: &str) -> TaskExperience {
        let (status, Json(res)) =
            add_experience(State(j.state.clone()), AuthUser(author), Path(match_id), body(content))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        res.experience
    }

    #[tokio::test]
    async fn entry_is_created_with_author_name() {
        let j = seeded().await;
        let (status, Json(res)) = add_experience(
            State(j.state.clone()),
            AuthUser(j.ann),
            Path(j.match_id),
            Ok(Json(NewExperienceRequest {
                content: "  we read Dune  ".into(),
                proof_url: Some(" https://img.example/dune.jpg ".into()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let e = res.experience;
        assert_eq!(e.author_name, "Ann");
        assert_eq!(e.user_id, j.ann);
        assert_eq!(e.match_id, j.match_id);
        assert_eq!(e.content, "we read Dune");
        assert_eq!(e.proof_url.as_deref(), Some("https://img.example/dune.jpg"));

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["author_name"], "Ann");
    }

    #[tokio::test]
    async fn match_journal_is_newest_first() {
        let j = seeded().await;
        write(&j, j.ann, j.match_id, "first chapter").await;
        write(&j, j.ben, j.match_id, "second chapter").await;

        let Json(res) = list_experiences(State(j.state.clone()), AuthUser(j.ann), Path(j.match_id))
            .await
            .unwrap();
        let entries: Vec<_> = res
            .experiences
            .iter()
            .map(|e| (e.content.as_str(), e.author_name.as_str()))
            .collect();
        assert_eq!(entries, vec![("second chapter", "Ben"), ("first chapter", "Ann")]);
    }

    #[tokio::test]
    async fn own_journal_spans_matches() {
        let j = seeded().await;
        write(&j, j.ann, j.match_id, "book club").await;
        write(&j, j.ben, j.match_id, "ben's notes").await;

        for caller in [j.ann, j.ben] {
            let mut rng = StdRng::seed_from_u64(9);
            services::apply_action(
                &j.state,
                j.match_id,
                caller,
                MatchAction::RequestFriend,
                None,
                &mut rng,
            )
            .await
            .unwrap();
        }
        let cal = j.store.add_user("Cal", Some(Gender::Boy), vec![]).await;
        let second = j
            .state
            .matches
            .create(NewMatch {
                participant_a: j.ann,
                participant_b: cal,
                score: 1,
                task_id: j.task,
            })
            .await
            .unwrap();
        write(&j, j.ann, second.id, "library visit").await;

        let Json(res) = list_own_experiences(State(j.state.clone()), AuthUser(j.ann))
            .await
            .unwrap();
        let contents: Vec<_> = res.experiences.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["library visit", "book club"]);
    }

    #[tokio::test]
    async fn dissolving_a_match_drops_its_journal() {
        let j = seeded().await;
        write(&j, j.ann, j.match_id, "short lived").await;
        let mut rng = StdRng::seed_from_u64(1);
        services::apply_action(&j.state, j.match_id, j.ben, MatchAction::PartWays, None, &mut rng)
            .await
            .unwrap();
        assert!(j.state.experiences.list_for_author(j.ann).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outsiders_cannot_journal() {
        let j = seeded().await;
        let err = add_experience(
            State(j.state.clone()),
            AuthUser(Uuid::new_v4()),
            Path(j.match_id),
            body("we read Dune"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let j = seeded().await;
        let err = add_experience(
            State(j.state.clone()),
            AuthUser(j.ann),
            Path(j.match_id),
            body("  \n"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let j = seeded().await;
        let err = list_experiences(State(j.state.clone()), AuthUser(j.ann), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("match")));
    }
}
