pub mod auth_service;
pub mod bomb;
pub mod errors;
pub mod game_service;
pub mod player_directory;
pub mod roster;
pub mod round;
pub mod win_evaluator;
