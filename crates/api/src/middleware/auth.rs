//! API key authentication.
//!
//! Operator routes require the shared key configured as `API_KEY`, sent in
//! the `x-api-key` header. [`ApiKey`] is the Axum extractor enforcing it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use pump_common::error::AppError;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured API key.
///
/// ```ignore
/// async fn handler(_auth: ApiKey) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

/// Compare without short-circuiting on the first differing byte.
fn keys_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let expected = state.api_key.clone();

        async move {
            match presented {
                Some(key) if keys_match(&key, &expected) => Ok(ApiKey),
                Some(_) => Err(AppError::Auth("Invalid API key".to_string())),
                None => Err(AppError::Auth(format!(
                    "Missing '{}' header",
                    API_KEY_HEADER
                ))),
            }
        }
    }
}
