//! Investor discovery, investor profiles and the per-investor deal flow.

pub mod deal_flow;
pub mod handlers;
