use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod machine;
#[cfg(test)]
pub mod memory;
pub mod model;
pub mod scorer;
pub mod selector;
pub mod services;
pub mod store;
pub mod tasks;

pub fn router() -> Router<AppState> {
    handlers::match_routes()
}
