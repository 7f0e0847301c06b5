use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::services::errors::player_directory_errors::PlayerDirectoryError;

/// Why a plant or defuse was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BombActionError {
    WrongTeam,
    DeadPlayer,
    AlreadyPlanted,
    AlreadyDefused,
    AlreadyExploded,
    NotPlanted,
}

impl std::fmt::Display for BombActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BombActionError::WrongTeam => write!(f, "Your team cannot do that with the bomb"),
            BombActionError::DeadPlayer => write!(f, "Dead players cannot handle the bomb"),
            BombActionError::AlreadyPlanted => write!(f, "Bomb is already planted"),
            BombActionError::AlreadyDefused => write!(f, "Bomb has already been defused"),
            BombActionError::AlreadyExploded => write!(f, "Bomb has already exploded"),
            BombActionError::NotPlanted => write!(f, "No bomb planted to defuse"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameServiceError {
    NotInGame,
    AlreadyInGame,
    MissingIdentity,
    NotHost,
    GameNotFound,
    GameNotInLobby,
    RoundAlreadyActive,
    NoActiveRound,
    InvalidRange(String),
    InvalidBombAction(BombActionError),
    BombAlreadyExploded,
    InvalidTarget(String),
    ValidationError(String),
    /// A conditional write lost a race. Operations retry on this.
    Contention,
    StorageUnavailable(String),
}

impl std::fmt::Display for GameServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameServiceError::NotInGame => write!(f, "Not in a game"),
            GameServiceError::AlreadyInGame => write!(f, "Already in a game"),
            GameServiceError::MissingIdentity => {
                write!(f, "Must provide an account token or a session id")
            }
            GameServiceError::NotHost => write!(f, "Only the host can do that"),
            GameServiceError::GameNotFound => write!(f, "Game not found"),
            GameServiceError::GameNotInLobby => {
                write!(f, "Cannot change settings during active game")
            }
            GameServiceError::RoundAlreadyActive => write!(f, "Round already active"),
            GameServiceError::NoActiveRound => write!(f, "No active round"),
            GameServiceError::InvalidRange(msg) => write!(f, "{}", msg),
            GameServiceError::InvalidBombAction(reason) => write!(f, "{}", reason),
            GameServiceError::BombAlreadyExploded => write!(f, "Bomb has already exploded"),
            GameServiceError::InvalidTarget(msg) => write!(f, "Invalid target: {}", msg),
            GameServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            GameServiceError::Contention => write!(f, "Game was modified concurrently"),
            GameServiceError::StorageUnavailable(msg) => {
                write!(f, "Storage unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for GameServiceError {}

impl From<GameRepositoryError> for GameServiceError {
    fn from(err: GameRepositoryError) -> Self {
        match err {
            GameRepositoryError::Conflict => GameServiceError::Contention,
            GameRepositoryError::MembershipExists => GameServiceError::AlreadyInGame,
            other => GameServiceError::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<PlayerDirectoryError> for GameServiceError {
    fn from(err: PlayerDirectoryError) -> Self {
        match err {
            PlayerDirectoryError::MissingIdentity => GameServiceError::MissingIdentity,
            PlayerDirectoryError::RepositoryError(msg) => GameServiceError::StorageUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_service_kinds() {
        assert_eq!(
            GameServiceError::from(GameRepositoryError::Conflict),
            GameServiceError::Contention
        );
        assert_eq!(
            GameServiceError::from(GameRepositoryError::MembershipExists),
            GameServiceError::AlreadyInGame
        );
        assert!(matches!(
            GameServiceError::from(GameRepositoryError::DynamoDb("throttled".to_string())),
            GameServiceError::StorageUnavailable(msg) if msg.contains("throttled")
        ));
    }

    #[test]
    fn test_bomb_action_messages() {
        assert_eq!(
            GameServiceError::InvalidBombAction(BombActionError::NotPlanted).to_string(),
            "No bomb planted to defuse"
        );
        assert_eq!(
            GameServiceError::InvalidBombAction(BombActionError::AlreadyPlanted).to_string(),
            "Bomb is already planted"
        );
    }
}
