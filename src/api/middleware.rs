//! Bearer-token guard for the store API.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

/// Key required on every `/api/v1` request, if any.
#[derive(Clone, Debug, Default)]
pub struct ApiAuth {
    pub api_key: Option<String>,
}

impl ApiAuth {
    /// Read the key from `WEEKPLAN_API_KEY`. Blank values disable the guard.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("WEEKPLAN_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
        }
    }

    fn accepts(&self, header: Option<&str>) -> bool {
        let Some(expected) = self.api_key.as_deref() else {
            return true;
        };
        match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token == expected,
            None => false,
        }
    }
}

pub async fn auth_middleware(
    State(auth): State<ApiAuth>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if auth.accepts(header) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rejected request without a valid API key");
        Err(StatusCode::UNAUTHORIZED)
    }
}
