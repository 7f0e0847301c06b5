use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lambda_http::tracing::debug;

use crate::{error::ApiError, middleware::caller::Caller, state::AppState};
use shared::models::game::GameSettings;
use shared::models::requests::{JoinGameRequest, KickPlayerRequest};
use shared::models::responses::JoinGameResponse;
use shared::models::session::{GameView, SessionView};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/game/session", get(get_session))
        .route("/game/join", post(join_game))
        .route("/game/settings", put(update_settings))
        .route("/game/round/start", post(start_round))
        .route("/game/round/check", post(check_time_expiration))
        .route("/game/player/dead", post(mark_dead))
        .route("/game/bomb/plant", post(plant_bomb))
        .route("/game/bomb/defuse", post(defuse_bomb))
        .route("/game/leave", post(leave_game))
        .route("/game/kick", post(kick_player))
}

async fn get_session(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Option<SessionView>>, ApiError> {
    let session = state.game_service.get_current_session(&caller).await?;
    Ok(Json(session))
}

async fn join_game(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, ApiError> {
    let game_id = state
        .game_service
        .join_or_create_game(&caller, payload.team, &payload.player_name)
        .await?;

    debug!("{} joined game {}", payload.player_name, game_id);
    Ok(Json(JoinGameResponse { game_id }))
}

async fn update_settings(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(settings): Json<GameSettings>,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game_service.update_settings(&caller, settings).await?;
    Ok(Json(GameView::from(&game)))
}

async fn start_round(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game_service.start_round(&caller).await?;
    Ok(Json(GameView::from(&game)))
}

async fn check_time_expiration(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game_service.check_time_expiration(&caller).await?;
    Ok(Json(GameView::from(&game)))
}

async fn mark_dead(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game_service.mark_dead(&caller).await?;
    Ok(Json(GameView::from(&game)))
}

async fn plant_bomb(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game_service.plant_bomb(&caller).await?;
    Ok(Json(GameView::from(&game)))
}

async fn defuse_bomb(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game_service.defuse_bomb(&caller).await?;
    Ok(Json(GameView::from(&game)))
}

async fn leave_game(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<StatusCode, ApiError> {
    state.game_service.leave_game(&caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn kick_player(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(payload): Json<KickPlayerRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .game_service
        .kick_player(&caller, &payload.player_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
