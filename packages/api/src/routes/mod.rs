pub mod game;
pub mod health;
