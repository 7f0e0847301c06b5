use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::ApiError, state::AppState};
use shared::models::caller::CallerIdentity;
use shared::services::errors::game_service_errors::GameServiceError;

pub const SESSION_HEADER: &str = "X-Session-Id";

/// The identity behind a request: a verified bearer token, or else an
/// anonymous session header.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth_header) = parts.headers.get("Authorization") {
            let auth_header = auth_header.to_str().map_err(|_| ApiError::Unauthorized)?;
            // A malformed Authorization header is rejected, not ignored.
            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let caller = state.auth_service.caller_from_token(token.trim())?;
            return Ok(Caller(caller));
        }

        let session_id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        CallerIdentity::from_parts(None, None, session_id)
            .map(Caller)
            .ok_or(ApiError::GameService(GameServiceError::MissingIdentity))
    }
}
