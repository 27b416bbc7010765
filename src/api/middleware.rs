//! Bearer-token authentication for the API.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::ServerConfig;

/// Access rules for the HTTP API.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Token expected in `Authorization: Bearer <token>`. No auth when unset.
    pub api_key: Option<String>,
    /// Allowed CORS origins. Permissive when unset.
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    pub fn from_server(config: &ServerConfig) -> Self {
        Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            cors_origins: config.cors_origins.clone(),
        }
    }

    /// No authentication (local use and tests).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            cors_origins: None,
        }
    }
}

/// Reject requests without the configured bearer token.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_key) = &config.api_key else {
        return Ok(next.run(request).await);
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if token == expected_key => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Invalid API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
