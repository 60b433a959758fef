use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo_types::{NewUser, User},
    },
    error::ApiError,
    state::AppState,
    users::repo_types::Gender,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn bad_body(e: JsonRejection) -> ApiError {
    warn!(error = %e, "rejected auth body");
    ApiError::Validation(e.body_text())
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: user.into(),
    })
}

/// Checks everything about a registration that needs no database.
fn validate_registration(payload: &mut RegisterRequest) -> Result<(Gender, i32), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if payload.name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    let gender: Gender = payload
        .gender
        .parse()
        .map_err(|_| ApiError::Validation("gender must be either \"boy\" or \"girl\"".into()))?;
    let age = i32::try_from(payload.age)
        .ok()
        .filter(|a| *a > 0)
        .ok_or_else(|| ApiError::Validation("age must be a positive integer".into()))?;
    Ok((gender, age))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(mut payload) = payload.map_err(bad_body)?;
    let (gender, age) = validate_registration(&mut payload)?;

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            password_hash: &hash,
            name: &payload.name,
            age,
            gender: gender.as_str(),
        },
    )
    .await?
    .ok_or_else(|| {
        warn!(email = %payload.email, "email already registered");
        ApiError::Conflict("email already registered".into())
    })?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(mut payload) = payload.map_err(bad_body)?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }

    let invalid = || ApiError::Unauthorized("invalid credentials".into());
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login for unknown email");
        return Err(invalid());
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = load_user(&state, claims.sub).await?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(load_user(&state, user_id).await?.into()))
}

async fn load_user(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".into()))
}
