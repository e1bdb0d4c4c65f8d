//! Order-matching and settlement core for a peer-to-peer sports betting
//! exchange. `main.rs` is the composition root (binary); everything it
//! wires together lives here so integration tests can exercise the same
//! service functions the HTTP layer calls.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod money;
pub mod services;
pub mod side;
pub mod utils;

use crate::config::AppConfig;
use crate::db::Database;
use crate::events::BroadcastEventSink;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub events: Arc<BroadcastEventSink>,
}
