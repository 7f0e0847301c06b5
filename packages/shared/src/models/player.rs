use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Terrorist,
    CounterTerrorist,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Terrorist => write!(f, "terrorist"),
            Team::CounterTerrorist => write!(f, "counter_terrorist"),
        }
    }
}

/// How the directory recognises the same caller on later requests.
///
/// Exactly one of the two forms is stored per player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerIdentity {
    Account { account_id: String, user_id: String },
    Session { session_id: String },
}

impl PlayerIdentity {
    /// Key of the membership index; one membership per key.
    pub fn membership_key(&self) -> String {
        match self {
            PlayerIdentity::Account { account_id, .. } => account_key(account_id),
            PlayerIdentity::Session { session_id } => session_key(session_id),
        }
    }
}

/// Accounts are keyed by the provider's subject, which is known before any
/// user record exists.
pub fn account_key(account_id: &str) -> String {
    format!("account#{}", account_id)
}

pub fn session_key(session_id: &str) -> String {
    format!("session#{}", session_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub game_id: String,
    pub identity: PlayerIdentity,
    pub name: String,
    pub team: Team,
    pub is_alive: bool,
    pub is_host: bool,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(
        game_id: &str,
        identity: PlayerIdentity,
        name: &str,
        team: Team,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Player {
            player_id: Uuid::new_v4().to_string(),
            game_id: game_id.to_string(),
            identity,
            name: name.to_string(),
            team,
            is_alive: true,
            is_host: false,
            joined_at,
        }
    }
}
