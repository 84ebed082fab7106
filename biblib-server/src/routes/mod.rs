use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        documents::update_documents_handler,
        health::health_handler,
        libraries::{
            create_library_handler, get_library_handler, list_libraries_handler,
        },
        permissions::{list_permissions_handler, update_permission_handler},
    },
    infra::{app_state::AppState, request_context::request_context_middleware},
};

/// Library, document and permission routes.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/libraries",
            get(list_libraries_handler).post(create_library_handler),
        )
        .route("/libraries/{library}", get(get_library_handler))
        .route("/documents/{library}", post(update_documents_handler))
        .route(
            "/permissions/{library}",
            get(list_permissions_handler).post(update_permission_handler),
        )
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(create_api_router())
        // Outer to inner: tracing, CORS, then header extraction.
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_context_middleware)),
        )
        .with_state(state)
}
