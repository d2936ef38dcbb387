pub mod approvals;
pub mod diagnose;
pub mod health;
pub mod wallet;

use std::sync::Arc;

use crate::config::Config;
use crate::registry::ChainRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ChainRegistry>,
}
