// Application state module
// Shared, read-only state handed to every connection

use std::sync::Arc;

use super::types::Config;
use crate::function::{self, Function};

/// Application state
pub struct AppState {
    pub config: Config,
    /// The wrapped function, invoked once per `POST /`
    pub function: Arc<dyn Function>,
}

impl AppState {
    pub fn new(config: Config, function: Arc<dyn Function>) -> Self {
        Self { config, function }
    }

    /// Create `AppState` with the function collaborator described by `config.function`
    pub fn from_config(config: Config) -> Self {
        let function = function::from_config(&config.function);
        Self::new(config, function)
    }
}
