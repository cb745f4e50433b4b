// src/handlers/mod.rs

pub mod auth;
pub mod leaderboard;
pub mod play;
pub mod profile;
pub mod quiz;
