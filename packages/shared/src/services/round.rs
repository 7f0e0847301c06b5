//! Round lifecycle: lobby -> active -> finished -> active ...

use chrono::{DateTime, Duration, Utc};

use crate::models::game::{Game, GameStatus};
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::roster::require_host;
use crate::services::win_evaluator::{resolve_round, RoundOutcome};

/// Starts a new round from the lobby or a finished round.
///
/// Everyone is revived and the bomb and previous outcome are cleared.
pub fn start_round(
    game: &mut Game,
    caller_id: &str,
    now: DateTime<Utc>,
) -> Result<(), GameServiceError> {
    require_host(game, caller_id)?;
    if game.status == GameStatus::Active {
        return Err(GameServiceError::RoundAlreadyActive);
    }

    for player in game.players.iter_mut() {
        player.is_alive = true;
    }
    game.reset_round_state();
    game.status = GameStatus::Active;
    game.round_start_time = Some(now);
    game.round_end_time = Some(now + Duration::minutes(i64::from(game.round_time_minutes)));
    Ok(())
}

/// Marks `player_id` as eliminated and re-evaluates the round.
///
/// Dying twice is harmless; the second call only re-evaluates.
pub fn mark_dead(
    game: &mut Game,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<RoundOutcome>, GameServiceError> {
    if game.status != GameStatus::Active {
        return Err(GameServiceError::NoActiveRound);
    }
    let player = game
        .player_mut(player_id)
        .ok_or(GameServiceError::NotInGame)?;
    player.is_alive = false;

    Ok(resolve_round(game, now))
}

/// Time poll. Resolves an expired bomb or round timer; does nothing outside
/// an active round.
pub fn check_expiration(game: &mut Game, now: DateTime<Utc>) -> Option<RoundOutcome> {
    resolve_round(game, now)
}
