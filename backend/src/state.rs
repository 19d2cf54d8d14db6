// src/state.rs

use std::sync::Arc;

use crate::config::Config;
use crate::events::EventNotifier;
use crate::store::UserStore;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub notifier: Arc<dyn EventNotifier>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn UserStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<dyn EventNotifier> {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
