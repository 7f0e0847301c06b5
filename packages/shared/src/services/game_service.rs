use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GameConfig;
use crate::models::caller::CallerIdentity;
use crate::models::game::{Game, GameSettings};
use crate::models::membership::Membership;
use crate::models::player::{Player, PlayerIdentity, Team};
use crate::models::session::SessionView;
use crate::repositories::game_repository::GameRepository;
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::player_directory::PlayerDirectory;
use crate::services::roster::{self, host_invariant_holds, Departure};
use crate::services::win_evaluator::RoundOutcome;
use crate::services::{bomb, round};

/// The caller's place in a game, as read at the start of an attempt.
struct Seat {
    game: Game,
    player: Player,
    identity_key: String,
}

/// Entry point for every player action.
///
/// Each action reads the caller's game, applies a pure transition and commits
/// it with a version check. A lost race re-runs the action from a fresh read.
#[derive(Clone)]
pub struct GameService {
    repository: Arc<dyn GameRepository + Send + Sync>,
    directory: Arc<PlayerDirectory>,
    clock: Arc<dyn Clock>,
    config: GameConfig,
}

impl GameService {
    pub fn new(
        repository: Arc<dyn GameRepository + Send + Sync>,
        directory: Arc<PlayerDirectory>,
        clock: Arc<dyn Clock>,
        config: GameConfig,
    ) -> Self {
        GameService {
            repository,
            directory,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The caller's current game, or `None` if they are not in one.
    pub async fn get_current_session(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Option<SessionView>, GameServiceError> {
        let Some(seat) = self.find_seat(caller).await? else {
            return Ok(None);
        };
        Ok(Some(SessionView::new(
            &seat.game,
            &seat.player,
            self.clock.now(),
        )))
    }

    /// Joins the room's current game, creating a lobby if the room has none.
    /// Returns the game id.
    pub async fn join_or_create_game(
        &self,
        caller: &CallerIdentity,
        team: Team,
        player_name: &str,
    ) -> Result<String, GameServiceError> {
        let name = player_name.trim();
        if name.is_empty() {
            return Err(GameServiceError::ValidationError(
                "Player name cannot be empty".to_string(),
            ));
        }

        let identity = self.directory.resolve_or_register(caller, name).await?;
        let identity = &identity;
        self.with_retry("join", move || self.join_once(identity, team, name))
            .await
    }

    pub async fn update_settings(
        &self,
        caller: &CallerIdentity,
        settings: GameSettings,
    ) -> Result<Game, GameServiceError> {
        self.apply("update_settings", caller, move |game, player_id, _| {
            roster::update_settings(game, player_id, settings).map(|_| None)
        })
        .await
    }

    pub async fn start_round(&self, caller: &CallerIdentity) -> Result<Game, GameServiceError> {
        let game = self
            .apply("start_round", caller, |game, player_id, now| {
                round::start_round(game, player_id, now).map(|_| None)
            })
            .await?;
        info!(
            "Round started in game {} with {} players, ends at {:?}",
            game.game_id,
            game.players.len(),
            game.round_end_time
        );
        Ok(game)
    }

    pub async fn mark_dead(&self, caller: &CallerIdentity) -> Result<Game, GameServiceError> {
        self.apply("mark_dead", caller, round::mark_dead).await
    }

    pub async fn plant_bomb(&self, caller: &CallerIdentity) -> Result<Game, GameServiceError> {
        self.apply("plant_bomb", caller, bomb::plant_bomb).await
    }

    pub async fn defuse_bomb(&self, caller: &CallerIdentity) -> Result<Game, GameServiceError> {
        self.apply("defuse_bomb", caller, bomb::defuse_bomb).await
    }

    /// Resolves expired round or bomb timers. Writes only when a timer fired,
    /// so it is safe to poll.
    pub async fn check_time_expiration(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Game, GameServiceError> {
        self.apply("check_time_expiration", caller, |game, _, now| {
            Ok(round::check_expiration(game, now))
        })
        .await
    }

    /// Leaves the caller's game. Not being in a game is not an error.
    pub async fn leave_game(&self, caller: &CallerIdentity) -> Result<(), GameServiceError> {
        self.with_retry("leave", move || self.leave_once(caller))
            .await
    }

    pub async fn kick_player(
        &self,
        caller: &CallerIdentity,
        target_player_id: &str,
    ) -> Result<(), GameServiceError> {
        self.with_retry("kick", move || self.kick_once(caller, target_player_id))
            .await
    }

    async fn join_once(
        &self,
        identity: &PlayerIdentity,
        team: Team,
        name: &str,
    ) -> Result<String, GameServiceError> {
        let identity_key = identity.membership_key();
        if self
            .repository
            .get_membership(&identity_key)
            .await?
            .is_some()
        {
            return Err(GameServiceError::AlreadyInGame);
        }

        let now = self.clock.now();
        let room_game_id = self
            .repository
            .get_room_game_id(&self.config.room_id)
            .await?;

        let (mut game, is_new) = match room_game_id {
            Some(game_id) => {
                // The pointer and the game are written together; a gap means
                // the game was deleted between the two reads.
                let game = self
                    .repository
                    .get_game(&game_id)
                    .await?
                    .ok_or(GameServiceError::Contention)?;
                (game, false)
            }
            None => (
                Game::new(&self.config.room_id, self.config.default_settings, now),
                true,
            ),
        };

        let player = Player::new(&game.game_id, identity.clone(), name, team, now);
        let membership = Membership::new(&identity_key, &game.game_id, &player.player_id, now);
        let player_id = player.player_id.clone();
        let became_host = roster::add_player(&mut game, player, &self.config);
        debug_assert!(host_invariant_holds(&game));

        if is_new {
            self.repository.create_game(&game, &membership).await?;
            info!(
                "Created game {} in room {} with host {}",
                game.game_id, game.room_id, player_id
            );
        } else {
            self.repository.add_player(&game, &membership).await?;
            info!(
                "Player {} joined game {} as {} (host: {})",
                player_id, game.game_id, team, became_host
            );
        }
        Ok(game.game_id)
    }

    async fn leave_once(&self, caller: &CallerIdentity) -> Result<(), GameServiceError> {
        let Some(Seat {
            mut game,
            player,
            identity_key,
        }) = self.find_seat(caller).await?
        else {
            debug!("Leave requested by a caller with no game");
            return Ok(());
        };

        let Some((_, departure)) =
            roster::remove_player(&mut game, &player.player_id, &self.config)
        else {
            return Ok(());
        };
        debug_assert!(host_invariant_holds(&game));

        match departure {
            Departure::GameEmptied => {
                self.repository.delete_game(&game, &identity_key).await?;
                info!(
                    "Game {} deleted after last player {} left",
                    game.game_id, player.player_id
                );
            }
            Departure::HostUnchanged => {
                self.repository.remove_player(&game, &identity_key).await?;
                info!("Player {} left game {}", player.player_id, game.game_id);
            }
            Departure::HostMigrated { new_host_id } => {
                self.repository.remove_player(&game, &identity_key).await?;
                info!(
                    "Host {} left game {}, host is now {}",
                    player.player_id, game.game_id, new_host_id
                );
            }
        }
        Ok(())
    }

    async fn kick_once(
        &self,
        caller: &CallerIdentity,
        target_player_id: &str,
    ) -> Result<(), GameServiceError> {
        let Seat {
            mut game, player, ..
        } = self.require_seat(caller).await?;
        roster::validate_kick(&game, &player.player_id, target_player_id)?;

        let Some((target, _)) = roster::remove_player(&mut game, target_player_id, &self.config)
        else {
            return Err(GameServiceError::InvalidTarget(
                "player is not in this game".to_string(),
            ));
        };
        debug_assert!(host_invariant_holds(&game));

        self.repository
            .remove_player(&game, &target.identity.membership_key())
            .await?;
        info!(
            "Host {} kicked player {} from game {}",
            player.player_id, target.player_id, game.game_id
        );
        Ok(())
    }

    /// Runs `transition` against the caller's game and commits the result.
    /// A transition that leaves the game untouched is not written.
    async fn apply<F>(
        &self,
        action: &'static str,
        caller: &CallerIdentity,
        transition: F,
    ) -> Result<Game, GameServiceError>
    where
        F: Fn(&mut Game, &str, DateTime<Utc>) -> Result<Option<RoundOutcome>, GameServiceError>
            + Send
            + Sync,
    {
        let transition = &transition;
        self.with_retry(action, move || async move {
            let Seat {
                mut game, player, ..
            } = self.require_seat(caller).await?;
            let before = game.clone();

            let outcome = transition(&mut game, &player.player_id, self.clock.now())?;
            if game == before {
                debug!("{} left game {} unchanged", action, game.game_id);
                return Ok(game);
            }
            self.commit(game, action, outcome).await
        })
        .await
    }

    async fn commit(
        &self,
        mut game: Game,
        action: &str,
        outcome: Option<RoundOutcome>,
    ) -> Result<Game, GameServiceError> {
        debug_assert!(host_invariant_holds(&game));
        self.repository.update_game(&game).await?;
        game.version += 1;

        debug!(
            "{} committed game {} at version {}",
            action, game.game_id, game.version
        );
        if let Some(outcome) = outcome {
            info!(
                "Round in game {} finished: winner {:?}, {} after {:?} ms",
                game.game_id, outcome.winner, outcome.reason, game.round_duration_ms
            );
        }
        Ok(game)
    }

    /// Re-runs `attempt` while it loses commit races, up to the configured
    /// number of attempts.
    async fn with_retry<T, F, Fut>(
        &self,
        action: &str,
        mut attempt: F,
    ) -> Result<T, GameServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GameServiceError>>,
    {
        let max_attempts = self.config.max_commit_attempts.max(1);
        for n in 1..=max_attempts {
            match attempt().await {
                Err(GameServiceError::Contention) => {
                    debug!(
                        "{} lost a commit race (attempt {}/{})",
                        action, n, max_attempts
                    );
                }
                other => return other,
            }
        }
        warn!(
            "{} still conflicting after {} attempts",
            action, max_attempts
        );
        Err(GameServiceError::StorageUnavailable(format!(
            "{} could not be committed after {} attempts",
            action, max_attempts
        )))
    }

    /// Looks up the caller's membership, game and player record. Never
    /// registers anything.
    ///
    /// A membership whose game is gone reports `GameNotFound`; one whose
    /// player is gone reports `NotInGame`.
    async fn require_seat(&self, caller: &CallerIdentity) -> Result<Seat, GameServiceError> {
        let identity_key = self.directory.identity_key(caller)?;

        let membership = self
            .repository
            .get_membership(&identity_key)
            .await?
            .ok_or(GameServiceError::NotInGame)?;
        let Some(game) = self.repository.get_game(&membership.game_id).await? else {
            warn!(
                "Membership {} points at missing game {}",
                identity_key, membership.game_id
            );
            return Err(GameServiceError::GameNotFound);
        };
        let Some(player) = game.player(&membership.player_id).cloned() else {
            warn!(
                "Membership {} points at player {} missing from game {}",
                identity_key, membership.player_id, game.game_id
            );
            return Err(GameServiceError::NotInGame);
        };

        Ok(Seat {
            game,
            player,
            identity_key,
        })
    }

    /// Like `require_seat`, but a caller without a usable seat is `None`.
    async fn find_seat(&self, caller: &CallerIdentity) -> Result<Option<Seat>, GameServiceError> {
        match self.require_seat(caller).await {
            Ok(seat) => Ok(Some(seat)),
            Err(GameServiceError::NotInGame | GameServiceError::GameNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MockClock};
    use crate::models::game::GameStatus;
    use crate::repositories::errors::game_repository_errors::GameRepositoryError;
    use crate::repositories::game_repository::MockGameRepository;
    use crate::repositories::errors::user_repository_errors::UserRepositoryError;
    use crate::repositories::memory::{InMemoryGameRepository, InMemoryUserRepository};
    use crate::repositories::user_repository::MockUserRepository;
    use crate::services::roster::add_player;

    fn session(id: &str) -> CallerIdentity {
        CallerIdentity::Session {
            session_id: id.to_string(),
        }
    }

    fn directory() -> Arc<PlayerDirectory> {
        Arc::new(PlayerDirectory::new(Arc::new(InMemoryUserRepository::new())))
    }

    fn service(repository: MockGameRepository, config: GameConfig) -> GameService {
        GameService::new(
            Arc::new(repository),
            directory(),
            Arc::new(ManualClock::new(Utc::now())),
            config,
        )
    }

    /// A stored lobby hosted by session "host", plus the host's membership.
    fn stored_lobby() -> (Game, Membership) {
        let now = Utc::now();
        let mut game = Game::new("default", GameSettings::default(), now);
        let host = Player::new(
            &game.game_id,
            PlayerIdentity::Session {
                session_id: "host".to_string(),
            },
            "Host",
            Team::Terrorist,
            now,
        );
        let membership = Membership::new("session#host", &game.game_id, &host.player_id, now);
        add_player(&mut game, host, &GameConfig::default());
        game.version = 1;
        (game, membership)
    }

    fn expect_seat(repository: &mut MockGameRepository, game: &Game, membership: &Membership) {
        let membership = membership.clone();
        repository
            .expect_get_membership()
            .returning(move |_| Ok(Some(membership.clone())));
        let game = game.clone();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(game.clone())));
    }

    #[tokio::test]
    async fn test_session_for_stranger_is_none() {
        let mut repository = MockGameRepository::new();
        repository.expect_get_membership().returning(|_| Ok(None));

        let view = service(repository, GameConfig::default())
            .get_current_session(&session("nobody"))
            .await
            .unwrap();

        assert!(view.is_none());
    }

    #[tokio::test]
    async fn test_join_rejects_blank_name_before_storage() {
        let mut repository = MockGameRepository::new();
        repository.expect_get_membership().never();

        let result = service(repository, GameConfig::default())
            .join_or_create_game(&session("a"), Team::Terrorist, "   ")
            .await;

        assert!(matches!(result, Err(GameServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_join_with_existing_membership_is_already_in_game() {
        let (game, membership) = stored_lobby();
        let mut repository = MockGameRepository::new();
        expect_seat(&mut repository, &game, &membership);
        repository.expect_add_player().never();
        repository.expect_create_game().never();

        let result = service(repository, GameConfig::default())
            .join_or_create_game(&session("host"), Team::Terrorist, "Host")
            .await;

        assert_eq!(result, Err(GameServiceError::AlreadyInGame));
    }

    #[tokio::test]
    async fn test_account_cannot_join_twice_when_user_lookup_lags() {
        // Every lookup misses and every create succeeds, so each join
        // registers a fresh user record for the same account.
        let mut users = MockUserRepository::new();
        users
            .expect_get_user_by_account()
            .returning(|_| Err(UserRepositoryError::NotFound));
        users.expect_create_user().returning(|_| Ok(()));
        let games = Arc::new(InMemoryGameRepository::new());
        let service = GameService::new(
            games.clone(),
            Arc::new(PlayerDirectory::new(Arc::new(users))),
            Arc::new(ManualClock::new(Utc::now())),
            GameConfig::default(),
        );
        let caller = CallerIdentity::Account {
            subject: "sub-1".to_string(),
            display_name: None,
        };

        let first = service
            .join_or_create_game(&caller, Team::Terrorist, "Alice")
            .await;
        let second = service
            .join_or_create_game(&caller, Team::CounterTerrorist, "Alice")
            .await;

        assert!(first.is_ok());
        assert_eq!(second, Err(GameServiceError::AlreadyInGame));
        assert_eq!(games.membership_count().await, 1);

        let view = service.get_current_session(&caller).await.unwrap().unwrap();
        assert_eq!(view.game.players.len(), 1);
        assert_eq!(view.current_player.team, Team::Terrorist);
    }

    #[tokio::test]
    async fn test_action_on_missing_game_is_game_not_found() {
        let (_, membership) = stored_lobby();
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_membership()
            .returning(move |_| Ok(Some(membership.clone())));
        repository.expect_get_game().returning(|_| Ok(None));
        repository.expect_update_game().never();
        let service = service(repository, GameConfig::default());

        assert_eq!(
            service.start_round(&session("host")).await,
            Err(GameServiceError::GameNotFound)
        );
        assert!(service
            .get_current_session(&session("host"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_join_retries_after_losing_room_race() {
        let (game, _) = stored_lobby();
        let game_id = game.game_id.clone();
        let mut repository = MockGameRepository::new();
        repository.expect_get_membership().returning(|_| Ok(None));

        let mut room_reads = 0;
        let pointer = game_id.clone();
        repository.expect_get_room_game_id().returning(move |_| {
            room_reads += 1;
            if room_reads == 1 {
                Ok(None)
            } else {
                Ok(Some(pointer.clone()))
            }
        });
        repository
            .expect_create_game()
            .times(1)
            .returning(|_, _| Err(GameRepositoryError::Conflict));
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(game.clone())));
        repository
            .expect_add_player()
            .times(1)
            .withf(|game, membership| {
                game.players.len() == 2
                    && !game.players[1].is_host
                    && membership.identity_key == "session#late"
            })
            .returning(|_, _| Ok(()));

        let joined = service(repository, GameConfig::default())
            .join_or_create_game(&session("late"), Team::CounterTerrorist, "Late")
            .await
            .unwrap();

        assert_eq!(joined, game_id);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces_as_storage_unavailable() {
        let (game, membership) = stored_lobby();
        let mut repository = MockGameRepository::new();
        expect_seat(&mut repository, &game, &membership);
        repository
            .expect_update_game()
            .times(3)
            .returning(|_| Err(GameRepositoryError::Conflict));

        let config = GameConfig {
            max_commit_attempts: 3,
            ..GameConfig::default()
        };
        let result = service(repository, config)
            .start_round(&session("host"))
            .await;

        assert!(matches!(
            result,
            Err(GameServiceError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_errors_are_not_retried() {
        let (game, membership) = stored_lobby();
        let mut repository = MockGameRepository::new();
        expect_seat(&mut repository, &game, &membership);
        repository.expect_update_game().never();

        let result = service(repository, GameConfig::default())
            .mark_dead(&session("host"))
            .await;

        assert_eq!(result, Err(GameServiceError::NoActiveRound));
    }

    #[tokio::test]
    async fn test_time_check_without_expiry_does_not_write() {
        let (mut game, membership) = stored_lobby();
        let defender = Player::new(
            &game.game_id,
            PlayerIdentity::Session {
                session_id: "ct".to_string(),
            },
            "CT",
            Team::CounterTerrorist,
            Utc::now(),
        );
        add_player(&mut game, defender, &GameConfig::default());
        game.status = GameStatus::Active;
        game.round_start_time = Some(Utc::now());
        game.round_end_time = Some(Utc::now() + chrono::Duration::minutes(5));
        let mut repository = MockGameRepository::new();
        expect_seat(&mut repository, &game, &membership);
        repository.expect_update_game().never();

        let unchanged = service(repository, GameConfig::default())
            .check_time_expiration(&session("host"))
            .await
            .unwrap();

        assert_eq!(unchanged.version, game.version);
        assert_eq!(unchanged.status, GameStatus::Active);
    }

    #[tokio::test]
    async fn test_start_round_uses_clock_and_bumps_version() {
        let (game, membership) = stored_lobby();
        let start = Utc::now();
        let mut repository = MockGameRepository::new();
        expect_seat(&mut repository, &game, &membership);
        repository
            .expect_update_game()
            .withf(|game| game.version == 1 && game.status == GameStatus::Active)
            .times(1)
            .returning(|_| Ok(()));
        let mut clock = MockClock::new();
        clock.expect_now().return_const(start);

        let service = GameService::new(
            Arc::new(repository),
            directory(),
            Arc::new(clock),
            GameConfig::default(),
        );
        let started = service.start_round(&session("host")).await.unwrap();

        assert_eq!(started.version, 2);
        assert_eq!(started.round_start_time, Some(start));
        assert_eq!(
            started.round_end_time,
            Some(start + chrono::Duration::minutes(5))
        );
    }

    #[tokio::test]
    async fn test_last_player_leaving_deletes_game() {
        let (game, membership) = stored_lobby();
        let mut repository = MockGameRepository::new();
        expect_seat(&mut repository, &game, &membership);
        repository
            .expect_delete_game()
            .withf(|game, key| game.players.is_empty() && key == "session#host")
            .times(1)
            .returning(|_, _| Ok(()));
        repository.expect_remove_player().never();

        service(repository, GameConfig::default())
            .leave_game(&session("host"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_leave_without_game_is_ok() {
        let mut repository = MockGameRepository::new();
        repository.expect_get_membership().returning(|_| Ok(None));
        repository.expect_remove_player().never();
        repository.expect_delete_game().never();

        service(repository, GameConfig::default())
            .leave_game(&session("nobody"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_retried() {
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_membership()
            .times(1)
            .returning(|_| Err(GameRepositoryError::DynamoDb("throttled".to_string())));

        let result = service(repository, GameConfig::default())
            .start_round(&session("host"))
            .await;

        assert!(matches!(
            result,
            Err(GameServiceError::StorageUnavailable(_))
        ));
    }
}
