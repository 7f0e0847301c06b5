use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_item};
use tracing::warn;

use crate::config::{required_env, ConfigError};
use crate::models::game::Game;
use crate::models::membership::Membership;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Storage for games, the identity -> membership index and the room pointer.
///
/// Every write that touches an existing game is conditional on
/// `game.version` matching the stored version and stores `version + 1`.
/// Multi-record writes are atomic.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError>;

    async fn get_membership(
        &self,
        identity_key: &str,
    ) -> Result<Option<Membership>, GameRepositoryError>;

    async fn get_room_game_id(&self, room_id: &str)
        -> Result<Option<String>, GameRepositoryError>;

    /// Inserts a new game, claims its room and records the host's membership.
    /// Fails with `Conflict` if the room already has a game.
    async fn create_game(
        &self,
        game: &Game,
        host: &Membership,
    ) -> Result<(), GameRepositoryError>;

    /// Saves a game that gained a player and records that player's membership.
    async fn add_player(
        &self,
        game: &Game,
        membership: &Membership,
    ) -> Result<(), GameRepositoryError>;

    async fn update_game(&self, game: &Game) -> Result<(), GameRepositoryError>;

    /// Saves a game that lost a player and drops that player's membership.
    async fn remove_player(
        &self,
        game: &Game,
        identity_key: &str,
    ) -> Result<(), GameRepositoryError>;

    /// Deletes an emptied game, its room pointer and the last membership.
    async fn delete_game(
        &self,
        game: &Game,
        identity_key: &str,
    ) -> Result<(), GameRepositoryError>;
}

pub struct DynamoDbGameRepository {
    pub client: Client,
    pub games_table: String,
    pub memberships_table: String,
    pub rooms_table: String,
}

impl DynamoDbGameRepository {
    pub fn new(
        client: Client,
        games_table: String,
        memberships_table: String,
        rooms_table: String,
    ) -> Self {
        Self {
            client,
            games_table,
            memberships_table,
            rooms_table,
        }
    }

    pub fn from_env(client: Client) -> Result<Self, ConfigError> {
        Ok(Self::new(
            client,
            required_env("GAMES_TABLE")?,
            required_env("MEMBERSHIPS_TABLE")?,
            required_env("ROOMS_TABLE")?,
        ))
    }

    fn put_game(&self, game: &Game, is_new: bool) -> Result<TransactWriteItem, GameRepositoryError> {
        let mut stored = game.clone();
        stored.version = game.version + 1;
        let item =
            to_item(&stored).map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;

        let put = Put::builder()
            .table_name(&self.games_table)
            .set_item(Some(item));
        let put = if is_new {
            put.condition_expression("attribute_not_exists(game_id)")
        } else {
            put.condition_expression("#version = :expected")
                .expression_attribute_names("#version", "version")
                .expression_attribute_values(
                    ":expected",
                    AttributeValue::N(game.version.to_string()),
                )
        };

        Ok(TransactWriteItem::builder()
            .put(put.build().map_err(transaction_error)?)
            .build())
    }

    fn delete_game_item(&self, game: &Game) -> Result<TransactWriteItem, GameRepositoryError> {
        let delete = Delete::builder()
            .table_name(&self.games_table)
            .key("game_id", AttributeValue::S(game.game_id.clone()))
            .condition_expression("#version = :expected")
            .expression_attribute_names("#version", "version")
            .expression_attribute_values(":expected", AttributeValue::N(game.version.to_string()))
            .build()
            .map_err(transaction_error)?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    fn put_membership(
        &self,
        membership: &Membership,
    ) -> Result<TransactWriteItem, GameRepositoryError> {
        let item =
            to_item(membership).map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
        let put = Put::builder()
            .table_name(&self.memberships_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(identity_key)")
            .build()
            .map_err(transaction_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn delete_membership(&self, identity_key: &str) -> Result<TransactWriteItem, GameRepositoryError> {
        let delete = Delete::builder()
            .table_name(&self.memberships_table)
            .key("identity_key", AttributeValue::S(identity_key.to_string()))
            .build()
            .map_err(transaction_error)?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    fn put_room(&self, game: &Game) -> Result<TransactWriteItem, GameRepositoryError> {
        let put = Put::builder()
            .table_name(&self.rooms_table)
            .item("room_id", AttributeValue::S(game.room_id.clone()))
            .item("game_id", AttributeValue::S(game.game_id.clone()))
            .condition_expression("attribute_not_exists(room_id)")
            .build()
            .map_err(transaction_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn delete_room(&self, game: &Game) -> Result<TransactWriteItem, GameRepositoryError> {
        let delete = Delete::builder()
            .table_name(&self.rooms_table)
            .key("room_id", AttributeValue::S(game.room_id.clone()))
            .condition_expression("game_id = :game_id")
            .expression_attribute_values(":game_id", AttributeValue::S(game.game_id.clone()))
            .build()
            .map_err(transaction_error)?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    /// Runs `items` as one transaction. A failed condition on the item at
    /// `membership_index` means the identity is already placed elsewhere;
    /// any other failed condition is a concurrent write.
    async fn transact(
        &self,
        items: Vec<TransactWriteItem>,
        membership_index: Option<usize>,
    ) -> Result<(), GameRepositoryError> {
        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(service_err)) => {
                Err(cancellation_error(service_err.err(), membership_index))
            }
            Err(e) => Err(GameRepositoryError::DynamoDb(e.to_string())),
        }
    }
}

fn transaction_error(e: aws_sdk_dynamodb::error::BuildError) -> GameRepositoryError {
    GameRepositoryError::DynamoDb(format!("Invalid transaction item: {}", e))
}

#[async_trait]
impl GameRepository for DynamoDbGameRepository {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.games_table)
            .key("game_id", AttributeValue::S(game_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                let game: Game = from_item(item)
                    .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(game))
            }
            None => Ok(None),
        }
    }

    async fn get_membership(
        &self,
        identity_key: &str,
    ) -> Result<Option<Membership>, GameRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.memberships_table)
            .key("identity_key", AttributeValue::S(identity_key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                let membership: Membership = from_item(item)
                    .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(membership))
            }
            None => Ok(None),
        }
    }

    async fn get_room_game_id(
        &self,
        room_id: &str,
    ) -> Result<Option<String>, GameRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.rooms_table)
            .key("room_id", AttributeValue::S(room_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        let game_id = result
            .item
            .as_ref()
            .and_then(|item| item.get("game_id"))
            .and_then(|value| value.as_s().ok())
            .cloned();
        Ok(game_id)
    }

    async fn create_game(
        &self,
        game: &Game,
        host: &Membership,
    ) -> Result<(), GameRepositoryError> {
        let items = vec![
            self.put_room(game)?,
            self.put_game(game, true)?,
            self.put_membership(host)?,
        ];
        self.transact(items, Some(2)).await
    }

    async fn add_player(
        &self,
        game: &Game,
        membership: &Membership,
    ) -> Result<(), GameRepositoryError> {
        let items = vec![self.put_game(game, false)?, self.put_membership(membership)?];
        self.transact(items, Some(1)).await
    }

    async fn update_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let mut stored = game.clone();
        stored.version = game.version + 1;
        let item =
            to_item(&stored).map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.games_table)
            .set_item(Some(item))
            .condition_expression("#version = :expected")
            .expression_attribute_names("#version", "version")
            .expression_attribute_values(":expected", AttributeValue::N(game.version.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(GameRepositoryError::Conflict);
                    }
                }
                Err(GameRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn remove_player(
        &self,
        game: &Game,
        identity_key: &str,
    ) -> Result<(), GameRepositoryError> {
        let items = vec![
            self.put_game(game, false)?,
            self.delete_membership(identity_key)?,
        ];
        self.transact(items, None).await
    }

    async fn delete_game(
        &self,
        game: &Game,
        identity_key: &str,
    ) -> Result<(), GameRepositoryError> {
        let items = vec![
            self.delete_game_item(game)?,
            self.delete_room(game)?,
            self.delete_membership(identity_key)?,
        ];
        self.transact(items, None).await
    }
}

/// An in-flight clash on the same items counts as a lost race.
fn cancellation_error(
    err: &TransactWriteItemsError,
    membership_index: Option<usize>,
) -> GameRepositoryError {
    match err {
        TransactWriteItemsError::TransactionCanceledException(cancelled) => {
            let membership_failed = membership_index.is_some_and(|index| {
                cancelled
                    .cancellation_reasons()
                    .get(index)
                    .and_then(|reason| reason.code())
                    == Some("ConditionalCheckFailed")
            });
            if membership_failed {
                GameRepositoryError::MembershipExists
            } else {
                GameRepositoryError::Conflict
            }
        }
        TransactWriteItemsError::TransactionInProgressException(_) => GameRepositoryError::Conflict,
        other => {
            warn!("Transaction failed: {}", other);
            GameRepositoryError::DynamoDb(other.to_string())
        }
    }
}
