use std::sync::Arc;

use shared::services::auth_service::AuthServiceTrait;
use shared::services::game_service::GameService;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServiceTrait>,
    pub game_service: Arc<GameService>,
}
