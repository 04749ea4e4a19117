//! Shared application state threaded through axum's extractor: a small
//! `Clone`-able struct of `Arc`-wrapped shared resources, constructed once
//! at startup.

use std::sync::Arc;

use crate::broker::Broker;
use crate::session::SessionConfig;
use crate::store::RoomStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub broker: Arc<Broker>,
    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn RoomStore>, session_config: SessionConfig) -> Self {
        Self { store, broker: Arc::new(Broker::new()), session_config }
    }
}
