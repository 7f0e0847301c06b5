use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record for an authenticated account.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(account_id: String, name: String) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            account_id,
            name,
            is_anonymous: false,
            created_at: Utc::now(),
        }
    }
}
