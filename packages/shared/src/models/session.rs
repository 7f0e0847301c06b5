use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::{BombStatus, Game, GameStatus, WinReason, Winner};
use crate::models::player::{Player, Team};

/// Roster entry as other players see it. The caller identity stays private.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: String,
    pub name: String,
    pub team: Team,
    pub is_alive: bool,
    pub is_host: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        PlayerView {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            team: player.team,
            is_alive: player.is_alive,
            is_host: player.is_host,
            joined_at: player.joined_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: String,
    pub room_id: String,
    pub status: GameStatus,
    pub round_time_minutes: u32,
    pub bomb_time_seconds: u32,
    pub host_player_id: Option<String>,
    pub players: Vec<PlayerView>,
    pub round_start_time: Option<DateTime<Utc>>,
    pub round_end_time: Option<DateTime<Utc>>,
    pub bomb_status: BombStatus,
    pub bomb_plant_time: Option<DateTime<Utc>>,
    pub bomb_explode_time: Option<DateTime<Utc>>,
    pub bomb_planted_by: Option<String>,
    pub bomb_defused_by: Option<String>,
    pub winner: Option<Winner>,
    pub win_reason: Option<WinReason>,
    pub round_duration_ms: Option<i64>,
    pub version: u64,
}

impl From<&Game> for GameView {
    fn from(game: &Game) -> Self {
        GameView {
            game_id: game.game_id.clone(),
            room_id: game.room_id.clone(),
            status: game.status,
            round_time_minutes: game.round_time_minutes,
            bomb_time_seconds: game.bomb_time_seconds,
            host_player_id: game.host_player_id.clone(),
            players: game.players.iter().map(PlayerView::from).collect(),
            round_start_time: game.round_start_time,
            round_end_time: game.round_end_time,
            bomb_status: game.bomb_status,
            bomb_plant_time: game.bomb_plant_time,
            bomb_explode_time: game.bomb_explode_time,
            bomb_planted_by: game.bomb_planted_by.clone(),
            bomb_defused_by: game.bomb_defused_by.clone(),
            winner: game.winner,
            win_reason: game.win_reason,
            round_duration_ms: game.round_duration_ms,
            version: game.version,
        }
    }
}

/// A caller's view of the game they belong to: the game with its roster,
/// the caller's own record, and timers as of the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub game: GameView,
    pub current_player: PlayerView,
    pub round_time_remaining_ms: Option<i64>,
    pub bomb_time_remaining_ms: Option<i64>,
}

impl SessionView {
    pub fn new(game: &Game, current_player: &Player, now: DateTime<Utc>) -> Self {
        let active = game.status == GameStatus::Active;
        let remaining = |until: Option<DateTime<Utc>>| {
            until.map(|at| (at - now).num_milliseconds().max(0))
        };

        let round_time_remaining_ms = if active {
            remaining(game.round_end_time)
        } else {
            None
        };
        let bomb_time_remaining_ms = if active && game.bomb_status == BombStatus::Planted {
            remaining(game.bomb_explode_time)
        } else {
            None
        };

        SessionView {
            game: GameView::from(game),
            current_player: PlayerView::from(current_player),
            round_time_remaining_ms,
            bomb_time_remaining_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::GameSettings;
    use crate::models::player::PlayerIdentity;
    use chrono::Duration;

    fn game_with_player() -> (Game, Player) {
        let now = Utc::now();
        let mut game = Game::new("default", GameSettings::default(), now);
        let player = Player::new(
            &game.game_id,
            PlayerIdentity::Session {
                session_id: "s1".to_string(),
            },
            "Alice",
            Team::Terrorist,
            now,
        );
        game.players.push(player.clone());
        (game, player)
    }

    #[test]
    fn test_lobby_has_no_timers() {
        let (game, player) = game_with_player();
        let view = SessionView::new(&game, &player, Utc::now());

        assert!(view.round_time_remaining_ms.is_none());
        assert!(view.bomb_time_remaining_ms.is_none());
    }

    #[test]
    fn test_active_round_timers_saturate_at_zero() {
        let (mut game, player) = game_with_player();
        let start = Utc::now();
        game.status = GameStatus::Active;
        game.round_end_time = Some(start + Duration::minutes(5));
        game.bomb_status = BombStatus::Planted;
        game.bomb_explode_time = Some(start + Duration::seconds(40));

        let view = SessionView::new(&game, &player, start + Duration::seconds(10));
        assert_eq!(view.round_time_remaining_ms, Some(290_000));
        assert_eq!(view.bomb_time_remaining_ms, Some(30_000));

        let late = SessionView::new(&game, &player, start + Duration::seconds(50));
        assert_eq!(late.bomb_time_remaining_ms, Some(0));
    }

    #[test]
    fn test_serializes_game_fields_flat() {
        let (game, player) = game_with_player();
        let game_id = game.game_id.clone();
        let view = SessionView::new(&game, &player, Utc::now());

        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["game_id"], game_id);
        assert_eq!(json["status"], "lobby");
        assert_eq!(json["current_player"]["name"], "Alice");
        assert_eq!(json["players"].as_array().unwrap().len(), 1);
        assert!(json["players"][0].get("identity").is_none());
        assert!(json["current_player"].get("identity").is_none());
    }
}
