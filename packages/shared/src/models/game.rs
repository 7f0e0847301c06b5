use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::player::{Player, Team};

pub const ROUND_TIME_MINUTES_RANGE: RangeInclusive<u32> = 1..=20;
pub const BOMB_TIME_SECONDS_RANGE: RangeInclusive<u32> = 40..=300;

pub const DEFAULT_ROUND_TIME_MINUTES: u32 = 5;
pub const DEFAULT_BOMB_TIME_SECONDS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Lobby,
    Active,
    Finished,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Lobby => write!(f, "lobby"),
            GameStatus::Active => write!(f, "active"),
            GameStatus::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BombStatus {
    #[default]
    NotPlanted,
    Planted,
    Defused,
    Exploded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Terrorist,
    CounterTerrorist,
    Draw,
}

impl From<Team> for Winner {
    fn from(team: Team) -> Self {
        match team {
            Team::Terrorist => Winner::Terrorist,
            Team::CounterTerrorist => Winner::CounterTerrorist,
        }
    }
}

/// Classification of how a round ended. Serialized as the human-readable tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    #[serde(rename = "Bomb exploded")]
    BombExploded,
    #[serde(rename = "Bomb defused")]
    BombDefused,
    #[serde(rename = "Both teams eliminated")]
    BothTeamsEliminated,
    #[serde(rename = "All terrorists eliminated")]
    TerroristsEliminated,
    #[serde(rename = "All counter-terrorists eliminated")]
    CounterTerroristsEliminated,
    #[serde(rename = "Time expired - terrorists survive")]
    TimeExpiredTerroristsSurvive,
    #[serde(rename = "Time expired - counter-terrorists survive")]
    TimeExpiredCounterTerroristsSurvive,
    #[serde(rename = "Time expired - both teams survive")]
    TimeExpiredBothTeamsSurvive,
    #[serde(rename = "Time expired - terrorists win by default")]
    TimeExpiredTerroristsByDefault,
}

impl WinReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinReason::BombExploded => "Bomb exploded",
            WinReason::BombDefused => "Bomb defused",
            WinReason::BothTeamsEliminated => "Both teams eliminated",
            WinReason::TerroristsEliminated => "All terrorists eliminated",
            WinReason::CounterTerroristsEliminated => "All counter-terrorists eliminated",
            WinReason::TimeExpiredTerroristsSurvive => "Time expired - terrorists survive",
            WinReason::TimeExpiredCounterTerroristsSurvive => {
                "Time expired - counter-terrorists survive"
            }
            WinReason::TimeExpiredBothTeamsSurvive => "Time expired - both teams survive",
            WinReason::TimeExpiredTerroristsByDefault => {
                "Time expired - terrorists win by default"
            }
        }
    }
}

impl std::fmt::Display for WinReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round and bomb timers a host can tune while the game is in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub round_time_minutes: u32,
    pub bomb_time_seconds: u32,
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !ROUND_TIME_MINUTES_RANGE.contains(&self.round_time_minutes) {
            return Err(format!(
                "Round time must be between {}-{} minutes",
                ROUND_TIME_MINUTES_RANGE.start(),
                ROUND_TIME_MINUTES_RANGE.end()
            ));
        }
        if !BOMB_TIME_SECONDS_RANGE.contains(&self.bomb_time_seconds) {
            return Err(format!(
                "Bomb time must be between {}-{} seconds",
                BOMB_TIME_SECONDS_RANGE.start(),
                BOMB_TIME_SECONDS_RANGE.end()
            ));
        }
        Ok(())
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            round_time_minutes: DEFAULT_ROUND_TIME_MINUTES,
            bomb_time_seconds: DEFAULT_BOMB_TIME_SECONDS,
        }
    }
}

/// One session of play in a room, stored as a single document together with
/// its roster so that every transition commits atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: String,
    pub room_id: String,
    pub status: GameStatus,
    pub round_time_minutes: u32,
    pub bomb_time_seconds: u32,
    pub host_player_id: Option<String>,
    /// Roster in join order.
    pub players: Vec<Player>,
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
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn new(room_id: &str, settings: GameSettings, created_at: DateTime<Utc>) -> Self {
        Game {
            game_id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            status: GameStatus::Lobby,
            round_time_minutes: settings.round_time_minutes,
            bomb_time_seconds: settings.bomb_time_seconds,
            host_player_id: None,
            players: vec![],
            round_start_time: None,
            round_end_time: None,
            bomb_status: BombStatus::NotPlanted,
            bomb_plant_time: None,
            bomb_explode_time: None,
            bomb_planted_by: None,
            bomb_defused_by: None,
            winner: None,
            win_reason: None,
            round_duration_ms: None,
            version: 0,
            created_at,
        }
    }

    pub fn settings(&self) -> GameSettings {
        GameSettings {
            round_time_minutes: self.round_time_minutes,
            bomb_time_seconds: self.bomb_time_seconds,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    pub fn host(&self) -> Option<&Player> {
        self.host_player_id
            .as_deref()
            .and_then(|host_id| self.player(host_id))
    }

    pub fn alive_count(&self, team: Team) -> usize {
        self.players
            .iter()
            .filter(|p| p.team == team && p.is_alive)
            .count()
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    /// Clears bomb state and the previous round's outcome.
    pub fn reset_round_state(&mut self) {
        self.bomb_status = BombStatus::NotPlanted;
        self.bomb_plant_time = None;
        self.bomb_explode_time = None;
        self.bomb_planted_by = None;
        self.bomb_defused_by = None;
        self.winner = None;
        self.win_reason = None;
        self.round_duration_ms = None;
    }
}
