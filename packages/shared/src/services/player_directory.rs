use std::sync::Arc;

use tracing::info;

use crate::models::caller::CallerIdentity;
use crate::models::player::{account_key, session_key, PlayerIdentity};
use crate::models::user::User;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::user_repository::UserRepository;
use crate::services::errors::player_directory_errors::PlayerDirectoryError;

/// Maps callers onto the stable identity their player records carry.
pub struct PlayerDirectory {
    repository: Arc<dyn UserRepository + Send + Sync>,
}

impl PlayerDirectory {
    pub fn new(repository: Arc<dyn UserRepository + Send + Sync>) -> Self {
        PlayerDirectory { repository }
    }

    /// The membership key for a caller. Needs no storage, so a caller's seat
    /// is found the same way whether or not their user record is readable yet.
    pub fn identity_key(&self, caller: &CallerIdentity) -> Result<String, PlayerDirectoryError> {
        match caller {
            CallerIdentity::Account { subject, .. } => Ok(account_key(non_blank(subject)?)),
            CallerIdentity::Session { session_id } => Ok(session_key(non_blank(session_id)?)),
        }
    }

    /// Resolves a caller without creating anything. `Ok(None)` means an
    /// account caller that has never joined a game.
    pub async fn resolve(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Option<PlayerIdentity>, PlayerDirectoryError> {
        match caller {
            CallerIdentity::Account { subject, .. } => {
                let subject = non_blank(subject)?;
                match self.repository.get_user_by_account(subject).await {
                    Ok(user) => Ok(Some(PlayerIdentity::Account {
                        account_id: user.account_id,
                        user_id: user.id,
                    })),
                    Err(UserRepositoryError::NotFound) => Ok(None),
                    Err(e) => Err(PlayerDirectoryError::RepositoryError(e.to_string())),
                }
            }
            CallerIdentity::Session { session_id } => Ok(Some(PlayerIdentity::Session {
                session_id: non_blank(session_id)?.to_string(),
            })),
        }
    }

    /// Resolves a caller, creating the durable user record for an account
    /// caller on first sight. `fallback_name` names the record when the
    /// token carries no display name.
    pub async fn resolve_or_register(
        &self,
        caller: &CallerIdentity,
        fallback_name: &str,
    ) -> Result<PlayerIdentity, PlayerDirectoryError> {
        if let Some(identity) = self.resolve(caller).await? {
            return Ok(identity);
        }

        let CallerIdentity::Account {
            subject,
            display_name,
        } = caller
        else {
            return Err(PlayerDirectoryError::MissingIdentity);
        };

        let subject = non_blank(subject)?;
        let name = display_name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string());
        let user = User::new(subject.to_string(), name);

        match self.repository.create_user(&user).await {
            Ok(()) => {
                info!("Registered user {} for account {}", user.id, subject);
                Ok(PlayerIdentity::Account {
                    account_id: user.account_id,
                    user_id: user.id,
                })
            }
            // Lost a race with a concurrent first join; use the winner's record.
            Err(UserRepositoryError::AlreadyExists) => {
                let existing = self
                    .repository
                    .get_user_by_account(subject)
                    .await
                    .map_err(|e| PlayerDirectoryError::RepositoryError(e.to_string()))?;
                Ok(PlayerIdentity::Account {
                    account_id: existing.account_id,
                    user_id: existing.id,
                })
            }
            Err(e) => Err(PlayerDirectoryError::RepositoryError(e.to_string())),
        }
    }
}

fn non_blank(value: &str) -> Result<&str, PlayerDirectoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(PlayerDirectoryError::MissingIdentity)
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::MockUserRepository;

    fn account(subject: &str, display_name: Option<&str>) -> CallerIdentity {
        CallerIdentity::Account {
            subject: subject.to_string(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_session_caller_resolves_without_storage() {
        let mut repository = MockUserRepository::new();
        repository.expect_get_user_by_account().never();
        let directory = PlayerDirectory::new(Arc::new(repository));

        let identity = directory
            .resolve(&CallerIdentity::Session {
                session_id: "tok-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            identity,
            Some(PlayerIdentity::Session {
                session_id: "tok-1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_blank_session_is_missing_identity() {
        let directory = PlayerDirectory::new(Arc::new(MockUserRepository::new()));

        let result = directory
            .resolve(&CallerIdentity::Session {
                session_id: "   ".to_string(),
            })
            .await;

        assert_eq!(result, Err(PlayerDirectoryError::MissingIdentity));
    }

    #[tokio::test]
    async fn test_unknown_account_resolves_to_none() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_get_user_by_account()
            .returning(|_| Err(UserRepositoryError::NotFound));
        repository.expect_create_user().never();
        let directory = PlayerDirectory::new(Arc::new(repository));

        let identity = directory.resolve(&account("sub-1", None)).await.unwrap();
        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn test_register_uses_token_name_before_fallback() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_get_user_by_account()
            .returning(|_| Err(UserRepositoryError::NotFound));
        repository
            .expect_create_user()
            .withf(|user| user.account_id == "sub-1" && user.name == "Token Name")
            .times(1)
            .returning(|_| Ok(()));
        let directory = PlayerDirectory::new(Arc::new(repository));

        let identity = directory
            .resolve_or_register(&account("sub-1", Some("Token Name")), "Typed Name")
            .await
            .unwrap();

        assert!(matches!(identity, PlayerIdentity::Account { .. }));
    }

    #[tokio::test]
    async fn test_existing_account_is_reused() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_get_user_by_account()
            .returning(|subject| {
                let mut user = User::new(subject.to_string(), "Alice".to_string());
                user.id = "user-42".to_string();
                Ok(user)
            });
        repository.expect_create_user().never();
        let directory = PlayerDirectory::new(Arc::new(repository));

        let identity = directory
            .resolve_or_register(&account("sub-1", None), "Alice")
            .await
            .unwrap();

        assert_eq!(
            identity,
            PlayerIdentity::Account {
                account_id: "sub-1".to_string(),
                user_id: "user-42".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_identity_key_needs_no_storage() {
        let mut repository = MockUserRepository::new();
        repository.expect_get_user_by_account().never();
        let directory = PlayerDirectory::new(Arc::new(repository));

        assert_eq!(
            directory.identity_key(&account(" sub-1 ", None)).unwrap(),
            "account#sub-1"
        );
        assert_eq!(
            directory
                .identity_key(&CallerIdentity::Session {
                    session_id: "tok-1".to_string()
                })
                .unwrap(),
            "session#tok-1"
        );
        assert_eq!(
            directory.identity_key(&account("  ", None)),
            Err(PlayerDirectoryError::MissingIdentity)
        );
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_get_user_by_account()
            .returning(|_| Err(UserRepositoryError::DynamoDb("timeout".to_string())));
        let directory = PlayerDirectory::new(Arc::new(repository));

        let result = directory.resolve(&account("sub-1", None)).await;
        assert!(matches!(result, Err(PlayerDirectoryError::RepositoryError(_))));
    }
}
