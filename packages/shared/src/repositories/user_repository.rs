use crate::config::{required_env, ConfigError};
use crate::models::user::User;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_item};

#[cfg(test)]
use mockall::automock;

/// Users keyed by `account_id`, so an account has at most one record.
pub struct DynamoDbUserRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn from_env(client: Client) -> Result<Self, ConfigError> {
        Ok(Self::new(client, required_env("USERS_TABLE")?))
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError>;
    async fn get_user_by_account(&self, account_id: &str) -> Result<User, UserRepositoryError>;
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let item = to_item(user).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(account_id)")
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(UserRepositoryError::AlreadyExists);
                    }
                }
                Err(UserRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn get_user_by_account(&self, account_id: &str) -> Result<User, UserRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("account_id", AttributeValue::S(account_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                from_item(item).map_err(|e| UserRepositoryError::Serialization(e.to_string()))
            }
            None => Err(UserRepositoryError::NotFound),
        }
    }
}
