mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::session::SessionRegistry;

pub use middleware::SecurityConfig;

pub fn create_router(registry: SessionRegistry, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Catalog
        .route("/personas", get(handlers::list_personas))
        .route("/intents", get(handlers::list_intents))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        // Setup
        .route("/sessions/{id}/draft/persona", put(handlers::select_persona))
        .route("/sessions/{id}/draft/intent", put(handlers::set_intent))
        .route("/sessions/{id}/draft/mantra", put(handlers::set_mantra))
        .route("/sessions/{id}/draft/duration", put(handlers::set_duration))
        .route("/sessions/{id}/draft/back", post(handlers::draft_back))
        // Running
        .route("/sessions/{id}/start", post(handlers::start_session))
        .route("/sessions/{id}/advance", post(handlers::advance_session))
        .route("/sessions/{id}/tick", post(handlers::tick_session))
        .route("/sessions/{id}/messages", post(handlers::send_message))
        .route("/sessions/{id}/repeat", post(handlers::repeat_narration))
        .route("/sessions/{id}/audio/next", get(handlers::next_audio))
        .route("/sessions/{id}/certificate", get(handlers::get_certificate))
        .route_layer(from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&security))
        .with_state(registry)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        None => CorsLayer::permissive(),
    }
}
