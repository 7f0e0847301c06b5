pub mod errors;
pub mod game_repository;
pub mod memory;
pub mod user_repository;
