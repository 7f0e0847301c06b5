use serde::{Deserialize, Serialize};

use crate::models::player::Team;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinGameRequest {
    pub team: Team,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickPlayerRequest {
    pub player_id: String,
}
