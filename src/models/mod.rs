// src/models/mod.rs

pub mod attempt;
pub mod quiz;
pub mod ranking;
pub mod user;
pub mod video;
