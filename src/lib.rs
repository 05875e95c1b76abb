//! Blackjack Tracker Backend Library
//!
//! Ticket settlement, wallet bookkeeping and the authenticated HTTP API
//! around them. The binary in `main.rs` wires these together.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod models;
pub mod settlement;
pub mod store;
