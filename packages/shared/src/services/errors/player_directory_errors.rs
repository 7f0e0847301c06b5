#[derive(Debug, Clone, PartialEq)]
pub enum PlayerDirectoryError {
    MissingIdentity,
    RepositoryError(String),
}

impl std::fmt::Display for PlayerDirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerDirectoryError::MissingIdentity => write!(f, "Caller identity is missing"),
            PlayerDirectoryError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for PlayerDirectoryError {}
