//! Community feed: posts with optional media, comments, likes, and the
//! open message board.

pub mod handlers;
pub mod media;
