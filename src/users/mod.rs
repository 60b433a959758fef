use crate::state::AppState;
use axum::Router;

pub mod directory;
pub mod handlers;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    handlers::profile_routes()
}
