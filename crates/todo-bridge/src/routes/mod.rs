pub mod health;
pub mod tools;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(tools::routes(state))
}
