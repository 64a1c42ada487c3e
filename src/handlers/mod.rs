pub mod auth;
pub mod profile;
pub mod quiz;
pub mod ranking;
pub mod video;
