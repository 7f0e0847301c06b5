//! In-process repositories with the same conditional-write semantics as the
//! DynamoDB ones. Used for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::game::Game;
use crate::models::membership::Membership;
use crate::models::user::User;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::user_repository::UserRepository;

#[derive(Default)]
struct Tables {
    games: HashMap<String, Game>,
    memberships: HashMap<String, Membership>,
    rooms: HashMap<String, String>,
}

impl Tables {
    fn check_version(&self, game: &Game) -> Result<(), GameRepositoryError> {
        match self.games.get(&game.game_id) {
            Some(stored) if stored.version == game.version => Ok(()),
            _ => Err(GameRepositoryError::Conflict),
        }
    }

    fn store(&mut self, game: &Game) {
        let mut stored = game.clone();
        stored.version = game.version + 1;
        self.games.insert(stored.game_id.clone(), stored);
    }
}

#[derive(Default)]
pub struct InMemoryGameRepository {
    tables: Mutex<Tables>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn game_count(&self) -> usize {
        self.tables.lock().await.games.len()
    }

    pub async fn membership_count(&self) -> usize {
        self.tables.lock().await.memberships.len()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        Ok(self.tables.lock().await.games.get(game_id).cloned())
    }

    async fn get_membership(
        &self,
        identity_key: &str,
    ) -> Result<Option<Membership>, GameRepositoryError> {
        Ok(self
            .tables
            .lock()
            .await
            .memberships
            .get(identity_key)
            .cloned())
    }

    async fn get_room_game_id(
        &self,
        room_id: &str,
    ) -> Result<Option<String>, GameRepositoryError> {
        Ok(self.tables.lock().await.rooms.get(room_id).cloned())
    }

    async fn create_game(
        &self,
        game: &Game,
        host: &Membership,
    ) -> Result<(), GameRepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.rooms.contains_key(&game.room_id) || tables.games.contains_key(&game.game_id) {
            return Err(GameRepositoryError::Conflict);
        }
        if tables.memberships.contains_key(&host.identity_key) {
            return Err(GameRepositoryError::MembershipExists);
        }

        tables
            .rooms
            .insert(game.room_id.clone(), game.game_id.clone());
        tables.store(game);
        tables
            .memberships
            .insert(host.identity_key.clone(), host.clone());
        Ok(())
    }

    async fn add_player(
        &self,
        game: &Game,
        membership: &Membership,
    ) -> Result<(), GameRepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.check_version(game)?;
        if tables.memberships.contains_key(&membership.identity_key) {
            return Err(GameRepositoryError::MembershipExists);
        }

        tables.store(game);
        tables
            .memberships
            .insert(membership.identity_key.clone(), membership.clone());
        Ok(())
    }

    async fn update_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.check_version(game)?;
        tables.store(game);
        Ok(())
    }

    async fn remove_player(
        &self,
        game: &Game,
        identity_key: &str,
    ) -> Result<(), GameRepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.check_version(game)?;
        tables.store(game);
        tables.memberships.remove(identity_key);
        Ok(())
    }

    async fn delete_game(
        &self,
        game: &Game,
        identity_key: &str,
    ) -> Result<(), GameRepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.check_version(game)?;
        if tables.rooms.get(&game.room_id) != Some(&game.game_id) {
            return Err(GameRepositoryError::Conflict);
        }

        tables.games.remove(&game.game_id);
        tables.rooms.remove(&game.room_id);
        tables.memberships.remove(identity_key);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.account_id) {
            return Err(UserRepositoryError::AlreadyExists);
        }
        users.insert(user.account_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_account(&self, account_id: &str) -> Result<User, UserRepositoryError> {
        self.users
            .lock()
            .await
            .get(account_id)
            .cloned()
            .ok_or(UserRepositoryError::NotFound)
    }
}
