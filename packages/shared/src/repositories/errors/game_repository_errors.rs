#[derive(Debug, Clone, PartialEq)]
pub enum GameRepositoryError {
    /// A version or room condition failed: someone else wrote first.
    Conflict,
    /// The identity already holds a membership in some game.
    MembershipExists,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for GameRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameRepositoryError::Conflict => write!(f, "Concurrent modification detected"),
            GameRepositoryError::MembershipExists => write!(f, "Membership already exists"),
            GameRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            GameRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for GameRepositoryError {}
