/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 *   - config: Config, auth: AuthService, store: UploadStore
 * - Clone is cheap (Arc inside); nothing here is mutated after startup
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::{auth::AuthService, storage::UploadStore};

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub store: UploadStore,
}

impl AppState {
    pub fn new(config: Arc<Config>, auth: Arc<AuthService>) -> Self {
        let store = UploadStore::new(config.upload_dir.clone());
        Self {
            config,
            auth,
            store,
        }
    }
}
