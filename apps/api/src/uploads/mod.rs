//! Resume uploads into object storage.

pub mod handlers;
pub mod store;
