use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index entry mapping a caller's identity to the single game it plays in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub identity_key: String,
    pub game_id: String,
    pub player_id: String,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(
        identity_key: &str,
        game_id: &str,
        player_id: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Membership {
            identity_key: identity_key.to_string(),
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            created_at,
        }
    }
}
