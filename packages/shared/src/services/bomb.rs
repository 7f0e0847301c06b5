//! The bomb: `not_planted -> planted -> {defused | exploded}`, only inside an
//! active round.

use chrono::{DateTime, Duration, Utc};

use crate::models::game::{BombStatus, Game, GameStatus};
use crate::models::player::{Player, Team};
use crate::services::errors::game_service_errors::{BombActionError, GameServiceError};
use crate::services::win_evaluator::{resolve_round, RoundOutcome};

/// Finds the acting player and checks the round allows bomb actions.
///
/// A finished round whose bomb already resolved reports the bomb state, so a
/// late second defuse reads as "already defused" rather than "no round".
fn actor<'a>(
    game: &'a Game,
    player_id: &str,
    team: Team,
) -> Result<&'a Player, GameServiceError> {
    let player = game.player(player_id).ok_or(GameServiceError::NotInGame)?;

    if game.status != GameStatus::Active {
        return Err(match game.bomb_status {
            BombStatus::Defused if game.status == GameStatus::Finished => {
                GameServiceError::InvalidBombAction(BombActionError::AlreadyDefused)
            }
            BombStatus::Exploded if game.status == GameStatus::Finished => {
                GameServiceError::InvalidBombAction(BombActionError::AlreadyExploded)
            }
            _ => GameServiceError::NoActiveRound,
        });
    }
    if player.team != team {
        return Err(GameServiceError::InvalidBombAction(
            BombActionError::WrongTeam,
        ));
    }
    if !player.is_alive {
        return Err(GameServiceError::InvalidBombAction(
            BombActionError::DeadPlayer,
        ));
    }
    Ok(player)
}

pub fn plant_bomb(
    game: &mut Game,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<RoundOutcome>, GameServiceError> {
    actor(game, player_id, Team::Terrorist)?;

    let refused = match game.bomb_status {
        BombStatus::NotPlanted => None,
        BombStatus::Planted => Some(BombActionError::AlreadyPlanted),
        BombStatus::Defused => Some(BombActionError::AlreadyDefused),
        BombStatus::Exploded => Some(BombActionError::AlreadyExploded),
    };
    if let Some(reason) = refused {
        return Err(GameServiceError::InvalidBombAction(reason));
    }

    game.bomb_status = BombStatus::Planted;
    game.bomb_plant_time = Some(now);
    game.bomb_explode_time = Some(now + Duration::seconds(i64::from(game.bomb_time_seconds)));
    game.bomb_planted_by = Some(player_id.to_string());

    Ok(resolve_round(game, now))
}

pub fn defuse_bomb(
    game: &mut Game,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<RoundOutcome>, GameServiceError> {
    actor(game, player_id, Team::CounterTerrorist)?;

    let refused = match game.bomb_status {
        BombStatus::Planted => None,
        BombStatus::NotPlanted => Some(BombActionError::NotPlanted),
        BombStatus::Defused => Some(BombActionError::AlreadyDefused),
        BombStatus::Exploded => Some(BombActionError::AlreadyExploded),
    };
    if let Some(reason) = refused {
        return Err(GameServiceError::InvalidBombAction(reason));
    }
    // Past its timer the bomb has gone off even if no poll has recorded it.
    if game.bomb_explode_time.is_some_and(|at| now >= at) {
        return Err(GameServiceError::BombAlreadyExploded);
    }

    game.bomb_status = BombStatus::Defused;
    game.bomb_defused_by = Some(player_id.to_string());

    Ok(resolve_round(game, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::{GameSettings, WinReason, Winner};
    use crate::models::player::PlayerIdentity;
    use test_case::test_case;

    struct Fixture {
        game: Game,
        terrorist: String,
        counter_terrorist: String,
        start: DateTime<Utc>,
    }

    fn active_round(bomb_time_seconds: u32) -> Fixture {
        let start = Utc::now();
        let settings = GameSettings {
            bomb_time_seconds,
            ..GameSettings::default()
        };
        let mut game = Game::new("default", settings, start);
        let mut t = Player::new(
            &game.game_id,
            PlayerIdentity::Session {
                session_id: "t".to_string(),
            },
            "T",
            Team::Terrorist,
            start,
        );
        t.is_host = true;
        game.host_player_id = Some(t.player_id.clone());
        let ct = Player::new(
            &game.game_id,
            PlayerIdentity::Session {
                session_id: "ct".to_string(),
            },
            "CT",
            Team::CounterTerrorist,
            start,
        );
        let terrorist = t.player_id.clone();
        let counter_terrorist = ct.player_id.clone();
        game.players = vec![t, ct];
        game.status = GameStatus::Active;
        game.round_start_time = Some(start);
        game.round_end_time = Some(start + Duration::minutes(5));

        Fixture {
            game,
            terrorist,
            counter_terrorist,
            start,
        }
    }

    #[test]
    fn test_plant_sets_timer() {
        let mut f = active_round(40);

        let outcome = plant_bomb(&mut f.game, &f.terrorist, f.start).unwrap();

        assert!(outcome.is_none());
        assert_eq!(f.game.bomb_status, BombStatus::Planted);
        assert_eq!(f.game.bomb_plant_time, Some(f.start));
        assert_eq!(
            f.game.bomb_explode_time,
            Some(f.start + Duration::seconds(40))
        );
        assert_eq!(f.game.bomb_planted_by.as_deref(), Some(f.terrorist.as_str()));
    }

    #[test]
    fn test_counter_terrorist_cannot_plant() {
        let mut f = active_round(40);
        assert_eq!(
            plant_bomb(&mut f.game, &f.counter_terrorist, f.start),
            Err(GameServiceError::InvalidBombAction(BombActionError::WrongTeam))
        );
    }

    #[test]
    fn test_dead_terrorist_cannot_plant() {
        let mut f = active_round(40);
        f.game.player_mut(&f.terrorist).unwrap().is_alive = false;
        assert_eq!(
            plant_bomb(&mut f.game, &f.terrorist, f.start),
            Err(GameServiceError::InvalidBombAction(BombActionError::DeadPlayer))
        );
    }

    #[test]
    fn test_second_plant_is_refused() {
        let mut f = active_round(40);
        plant_bomb(&mut f.game, &f.terrorist, f.start).unwrap();
        assert_eq!(
            plant_bomb(&mut f.game, &f.terrorist, f.start),
            Err(GameServiceError::InvalidBombAction(
                BombActionError::AlreadyPlanted
            ))
        );
    }

    #[test]
    fn test_plant_requires_active_round() {
        let mut f = active_round(40);
        f.game.status = GameStatus::Lobby;
        assert_eq!(
            plant_bomb(&mut f.game, &f.terrorist, f.start),
            Err(GameServiceError::NoActiveRound)
        );
    }

    #[test]
    fn test_plant_by_stranger_is_not_in_game() {
        let mut f = active_round(40);
        assert_eq!(
            plant_bomb(&mut f.game, "stranger", f.start),
            Err(GameServiceError::NotInGame)
        );
    }

    #[test]
    fn test_defuse_wins_for_counter_terrorists() {
        let mut f = active_round(40);
        plant_bomb(&mut f.game, &f.terrorist, f.start).unwrap();

        let outcome = defuse_bomb(
            &mut f.game,
            &f.counter_terrorist,
            f.start + Duration::seconds(39),
        )
        .unwrap()
        .unwrap();

        assert_eq!(outcome.winner, Winner::CounterTerrorist);
        assert_eq!(f.game.win_reason, Some(WinReason::BombDefused));
        assert_eq!(f.game.status, GameStatus::Finished);
        assert_eq!(
            f.game.bomb_defused_by.as_deref(),
            Some(f.counter_terrorist.as_str())
        );
    }

    #[test]
    fn test_defuse_after_defuse_is_invalid_bomb_action() {
        let mut f = active_round(40);
        plant_bomb(&mut f.game, &f.terrorist, f.start).unwrap();
        defuse_bomb(&mut f.game, &f.counter_terrorist, f.start).unwrap();

        assert_eq!(
            defuse_bomb(&mut f.game, &f.counter_terrorist, f.start),
            Err(GameServiceError::InvalidBombAction(
                BombActionError::AlreadyDefused
            ))
        );
    }

    #[test_case(40 ; "at explode time")]
    #[test_case(41 ; "after explode time")]
    fn test_defuse_of_due_bomb_fails(elapsed_seconds: i64) {
        let mut f = active_round(40);
        plant_bomb(&mut f.game, &f.terrorist, f.start).unwrap();
        let before = f.game.clone();

        let result = defuse_bomb(
            &mut f.game,
            &f.counter_terrorist,
            f.start + Duration::seconds(elapsed_seconds),
        );

        assert_eq!(result, Err(GameServiceError::BombAlreadyExploded));
        assert_eq!(f.game, before);
    }

    #[test]
    fn test_defuse_without_bomb_is_refused() {
        let mut f = active_round(40);
        assert_eq!(
            defuse_bomb(&mut f.game, &f.counter_terrorist, f.start),
            Err(GameServiceError::InvalidBombAction(BombActionError::NotPlanted))
        );
    }

    #[test]
    fn test_terrorist_cannot_defuse() {
        let mut f = active_round(40);
        plant_bomb(&mut f.game, &f.terrorist, f.start).unwrap();
        assert_eq!(
            defuse_bomb(&mut f.game, &f.terrorist, f.start),
            Err(GameServiceError::InvalidBombAction(BombActionError::WrongTeam))
        );
    }
}
