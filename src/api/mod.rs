mod handlers;
pub mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;

pub use middleware::ApiAuth;

/// Router with no API key check.
pub fn create_router(db: Database) -> Router {
    create_router_with_auth(db, ApiAuth::disabled())
}

pub fn create_router_with_auth(db: Database, auth: ApiAuth) -> Router {
    let api = Router::new()
        // Tasks
        .route("/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route(
            "/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/{id}/soft_delete", post(handlers::soft_delete_task))
        // Schedules
        .route("/schedules", get(handlers::list_schedules))
        .route("/schedules/bulk", post(handlers::create_bulk))
        .route("/schedules/move", post(handlers::move_hours))
        .route("/schedules/progress", get(handlers::weekly_progress))
        .route("/schedules/{id}/complete", post(handlers::mark_complete))
        .route("/schedules/{id}/incomplete", post(handlers::mark_incomplete))
        .route_layer(from_fn_with_state(auth, middleware::auth_middleware))
        // Health stays reachable without a key
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(db)
}
