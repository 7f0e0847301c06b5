pub mod auth;
pub mod caller;
pub mod game;
pub mod membership;
pub mod player;
pub mod requests;
pub mod responses;
pub mod session;
pub mod user;
