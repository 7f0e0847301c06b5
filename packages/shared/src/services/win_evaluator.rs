//! Decides whether an active round is over.
//!
//! Checks run in a fixed order and the first match wins:
//!
//! 1. bomb already exploded -> terrorists
//! 2. bomb defused -> counter-terrorists
//! 3. planted bomb past its explode time -> marked exploded, terrorists
//! 4. elimination (both wiped is a draw)
//! 5. round time expired, decided by who is still alive
//!
//! The evaluation is a function of the stored game and `now` only, so it is
//! safe to run after every action and on every poll.

use chrono::{DateTime, Utc};

use crate::models::game::{BombStatus, Game, GameStatus, WinReason, Winner};
use crate::models::player::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub winner: Winner,
    pub reason: WinReason,
    /// The bomb timer ran out during this evaluation and the bomb has to be
    /// recorded as exploded.
    pub detonated: bool,
}

impl RoundOutcome {
    fn new(winner: Winner, reason: WinReason) -> Self {
        RoundOutcome {
            winner,
            reason,
            detonated: false,
        }
    }
}

pub fn evaluate(game: &Game, now: DateTime<Utc>) -> Option<RoundOutcome> {
    if game.status != GameStatus::Active {
        return None;
    }

    match game.bomb_status {
        BombStatus::Exploded => {
            return Some(RoundOutcome::new(Winner::Terrorist, WinReason::BombExploded))
        }
        BombStatus::Defused => {
            return Some(RoundOutcome::new(
                Winner::CounterTerrorist,
                WinReason::BombDefused,
            ))
        }
        BombStatus::Planted if game.bomb_explode_time.is_some_and(|at| now >= at) => {
            return Some(RoundOutcome {
                winner: Winner::Terrorist,
                reason: WinReason::BombExploded,
                detonated: true,
            });
        }
        _ => {}
    }

    let terrorists = game.alive_count(Team::Terrorist);
    let counter_terrorists = game.alive_count(Team::CounterTerrorist);

    match (terrorists, counter_terrorists) {
        (0, 0) => {
            return Some(RoundOutcome::new(
                Winner::Draw,
                WinReason::BothTeamsEliminated,
            ))
        }
        (0, _) => {
            return Some(RoundOutcome::new(
                Winner::CounterTerrorist,
                WinReason::TerroristsEliminated,
            ))
        }
        (_, 0) => {
            return Some(RoundOutcome::new(
                Winner::Terrorist,
                WinReason::CounterTerroristsEliminated,
            ))
        }
        _ => {}
    }

    if !game.round_end_time.is_some_and(|end| now >= end) {
        return None;
    }

    let outcome = match (terrorists > 0, counter_terrorists > 0) {
        (true, false) => {
            RoundOutcome::new(Winner::Terrorist, WinReason::TimeExpiredTerroristsSurvive)
        }
        (false, true) => RoundOutcome::new(
            Winner::CounterTerrorist,
            WinReason::TimeExpiredCounterTerroristsSurvive,
        ),
        (true, true) => RoundOutcome::new(Winner::Draw, WinReason::TimeExpiredBothTeamsSurvive),
        // Shadowed by the elimination draw above; kept so the time rule is total.
        (false, false) => {
            RoundOutcome::new(Winner::Terrorist, WinReason::TimeExpiredTerroristsByDefault)
        }
    };
    Some(outcome)
}

/// Finishes the round with `outcome`.
pub fn apply(game: &mut Game, outcome: RoundOutcome, now: DateTime<Utc>) {
    if outcome.detonated {
        game.bomb_status = BombStatus::Exploded;
    }
    game.status = GameStatus::Finished;
    game.winner = Some(outcome.winner);
    game.win_reason = Some(outcome.reason);
    game.round_duration_ms = Some(
        game.round_start_time
            .map_or(0, |start| (now - start).num_milliseconds()),
    );
}

/// Evaluates and, if the round is over, applies the outcome.
pub fn resolve_round(game: &mut Game, now: DateTime<Utc>) -> Option<RoundOutcome> {
    let outcome = evaluate(game, now)?;
    apply(game, outcome, now);
    Some(outcome)
}
