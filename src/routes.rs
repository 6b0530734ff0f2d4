use crate::handlers;
use crate::AppState;
use axum::{
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// The user resource routes. Every path answers with and without a trailing
/// slash.
pub fn api_router(state: AppState) -> Router {
    let routes = [
        (
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        ),
        ("/api/users/active_users", get(handlers::active_users)),
        (
            "/api/users/{id}",
            get(handlers::retrieve_user)
                .put(handlers::update_user)
                .patch(handlers::partial_update_user)
                .delete(handlers::delete_user),
        ),
        ("/api/users/{id}/activate", post(handlers::activate_user)),
        ("/api/users/{id}/deactivate", post(handlers::deactivate_user)),
    ];

    routes
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            with_trailing_slash(router, path, method_router)
        })
        .with_state(state)
}

/// Full application: routes plus request tracing and CORS.
pub fn app(state: AppState) -> Router {
    api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn with_trailing_slash(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(&format!("{}/", path), method_router.clone())
        .route(path, method_router)
}
