// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, notify::Notifier, services::offset::OffsetSource, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub offsets: Arc<dyn OffsetSource>,
    pub config: Config,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
