use std::sync::Arc;

use barbcut_db::SharedStore;

use crate::config::ServerConfig;

/// Handler state: the document store plus the immutable server settings.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: SharedStore, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
