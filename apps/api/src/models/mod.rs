pub mod community;
pub mod deal;
pub mod profile;
pub mod user;
