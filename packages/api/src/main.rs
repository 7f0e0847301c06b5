use std::env::set_var;
use std::sync::Arc;

use lambda_http::{run, tracing::info, Error};
use tracing_subscriber::EnvFilter;

use api::state::AppState;
use shared::clock::SystemClock;
use shared::config::{ConfigError, GameConfig};
use shared::repositories::game_repository::{DynamoDbGameRepository, GameRepository};
use shared::repositories::memory::{InMemoryGameRepository, InMemoryUserRepository};
use shared::repositories::user_repository::{DynamoDbUserRepository, UserRepository};
use shared::services::auth_service::AuthService;
use shared::services::game_service::GameService;
use shared::services::player_directory::PlayerDirectory;

type Repositories = (
    Arc<dyn GameRepository + Send + Sync>,
    Arc<dyn UserRepository + Send + Sync>,
);

async fn repositories() -> Result<Repositories, ConfigError> {
    let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "dynamodb".to_string());

    match backend.as_str() {
        "memory" => Ok((
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        )),
        "dynamodb" => {
            let config = aws_config::load_from_env().await;
            let client = aws_sdk_dynamodb::Client::new(&config);
            Ok((
                Arc::new(DynamoDbGameRepository::from_env(client.clone())?),
                Arc::new(DynamoDbUserRepository::from_env(client)?),
            ))
        }
        other => Err(ConfigError::Invalid {
            key: "STORAGE_BACKEND".to_string(),
            message: format!("unknown backend '{}'", other),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    // JSON lines so CloudWatch can index fields
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = GameConfig::from_env()?;
    let auth_service = Arc::new(AuthService::from_env()?);
    let (game_repository, user_repository) = repositories().await?;

    let directory = Arc::new(PlayerDirectory::new(user_repository));
    let game_service = Arc::new(GameService::new(
        game_repository,
        directory,
        Arc::new(SystemClock),
        config,
    ));

    info!(
        "Serving room {} (reserved host override: {})",
        game_service.config().room_id,
        game_service.config().reserved_host_name.is_some()
    );

    let app_state = AppState {
        auth_service,
        game_service,
    };

    run(api::app(app_state)).await
}
