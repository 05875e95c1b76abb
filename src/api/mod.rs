pub mod error;
pub mod games;
pub mod routes;
pub mod wallet;

use crate::settlement::NumberRules;
use crate::store::Store;
use std::sync::Arc;

pub use routes::{cors_layer, create_router, RouterConfig};

/// Shared state for the ticket and wallet endpoints
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub rules: NumberRules,
}
