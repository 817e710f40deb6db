use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod delivery;
pub mod doc;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod products;
pub mod stores;

// State is attached by the caller.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/stores", stores::router())
        .nest("/orders", orders::router())
        .nest("/delivery", delivery::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
