//! Roster transitions: who is in a game and who holds host.
//!
//! Functions here mutate a loaded [`Game`] in memory; persisting the result
//! is the caller's job.

use crate::config::GameConfig;
use crate::models::game::{Game, GameSettings, GameStatus};
use crate::models::player::Player;
use crate::services::errors::game_service_errors::GameServiceError;

/// What a removal did to the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The roster is now empty and the game should be deleted.
    GameEmptied,
    HostUnchanged,
    HostMigrated { new_host_id: String },
}

/// Appends `player` to the roster. Returns `true` if the player became host.
///
/// The first player of a game is host. A player whose name matches the
/// configured reserved host name takes host from whoever holds it.
pub fn add_player(game: &mut Game, mut player: Player, config: &GameConfig) -> bool {
    let takes_host = game.players.is_empty() || config.is_reserved_host_name(&player.name);

    if takes_host {
        for existing in game.players.iter_mut() {
            existing.is_host = false;
        }
        player.is_host = true;
        game.host_player_id = Some(player.player_id.clone());
    } else {
        player.is_host = false;
    }

    game.players.push(player);
    takes_host
}

/// Removes `player_id` from the roster, migrating host if needed.
///
/// Returns `None` if the player is not in the roster.
pub fn remove_player(
    game: &mut Game,
    player_id: &str,
    config: &GameConfig,
) -> Option<(Player, Departure)> {
    let index = game.players.iter().position(|p| p.player_id == player_id)?;
    let removed = game.players.remove(index);

    if game.players.is_empty() {
        game.host_player_id = None;
        return Some((removed, Departure::GameEmptied));
    }
    if !removed.is_host {
        return Some((removed, Departure::HostUnchanged));
    }

    let successor = game
        .players
        .iter()
        .position(|p| config.is_reserved_host_name(&p.name))
        .unwrap_or(0);
    for (i, player) in game.players.iter_mut().enumerate() {
        player.is_host = i == successor;
    }
    let new_host_id = game.players[successor].player_id.clone();
    game.host_player_id = Some(new_host_id.clone());

    Some((removed, Departure::HostMigrated { new_host_id }))
}

pub fn require_host<'a>(game: &'a Game, player_id: &str) -> Result<&'a Player, GameServiceError> {
    let player = game.player(player_id).ok_or(GameServiceError::NotInGame)?;
    if !player.is_host || game.host_player_id.as_deref() != Some(player_id) {
        return Err(GameServiceError::NotHost);
    }
    Ok(player)
}

/// Checks that `caller_id` may remove `target_id` from the game.
pub fn validate_kick(game: &Game, caller_id: &str, target_id: &str) -> Result<(), GameServiceError> {
    require_host(game, caller_id)?;

    if caller_id == target_id {
        return Err(GameServiceError::InvalidTarget(
            "host cannot kick themselves".to_string(),
        ));
    }
    let target = game.player(target_id).ok_or_else(|| {
        GameServiceError::InvalidTarget("player is not in this game".to_string())
    })?;
    if target.is_host {
        return Err(GameServiceError::InvalidTarget(
            "cannot kick the host".to_string(),
        ));
    }
    Ok(())
}

pub fn update_settings(
    game: &mut Game,
    caller_id: &str,
    settings: GameSettings,
) -> Result<(), GameServiceError> {
    settings.validate().map_err(GameServiceError::InvalidRange)?;
    require_host(game, caller_id)?;
    if game.status != GameStatus::Lobby {
        return Err(GameServiceError::GameNotInLobby);
    }

    game.round_time_minutes = settings.round_time_minutes;
    game.bomb_time_seconds = settings.bomb_time_seconds;
    Ok(())
}

/// Exactly one host in a non-empty roster, and `host_player_id` names it;
/// no host at all in an empty one.
pub fn host_invariant_holds(game: &Game) -> bool {
    let hosts: Vec<&Player> = game.players.iter().filter(|p| p.is_host).collect();
    if game.players.is_empty() {
        return hosts.is_empty() && game.host_player_id.is_none();
    }
    hosts.len() == 1 && game.host_player_id.as_deref() == Some(hosts[0].player_id.as_str())
}
