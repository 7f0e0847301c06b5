use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lambda_http::tracing::error;
use shared::models::responses::ErrorResponse;
use shared::services::errors::{
    auth_service_errors::AuthServiceError,
    game_service_errors::{BombActionError, GameServiceError},
};

#[derive(Debug)]
pub enum ApiError {
    GameService(GameServiceError),
    AuthService(AuthServiceError),
    Unauthorized,
}

impl From<GameServiceError> for ApiError {
    fn from(error: GameServiceError) -> Self {
        ApiError::GameService(error)
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(error: AuthServiceError) -> Self {
        ApiError::AuthService(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::GameService(GameServiceError::NotInGame | GameServiceError::GameNotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::GameService(
                GameServiceError::AlreadyInGame
                | GameServiceError::RoundAlreadyActive
                | GameServiceError::GameNotInLobby
                | GameServiceError::NoActiveRound
                | GameServiceError::BombAlreadyExploded
                | GameServiceError::Contention,
            ) => StatusCode::CONFLICT,
            ApiError::GameService(GameServiceError::InvalidBombAction(
                BombActionError::WrongTeam | BombActionError::DeadPlayer,
            )) => StatusCode::BAD_REQUEST,
            ApiError::GameService(GameServiceError::InvalidBombAction(_)) => StatusCode::CONFLICT,
            ApiError::GameService(GameServiceError::NotHost) => StatusCode::FORBIDDEN,
            ApiError::GameService(GameServiceError::MissingIdentity) => StatusCode::UNAUTHORIZED,
            ApiError::GameService(
                GameServiceError::InvalidRange(_)
                | GameServiceError::InvalidTarget(_)
                | GameServiceError::ValidationError(_),
            ) => StatusCode::BAD_REQUEST,
            ApiError::GameService(GameServiceError::StorageUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ApiError::AuthService(
                AuthServiceError::InvalidToken | AuthServiceError::ExpiredToken,
            ) => StatusCode::UNAUTHORIZED,
            ApiError::AuthService(AuthServiceError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            ApiError::AuthService(AuthServiceError::JwtError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::GameService(e) => write!(f, "{}", e),
            ApiError::AuthService(e) => write!(f, "{}", e),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
