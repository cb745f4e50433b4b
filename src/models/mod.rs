// src/models/mod.rs

pub mod assignment;
pub mod question;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_session;
pub mod user;
