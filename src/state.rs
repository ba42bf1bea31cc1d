use std::sync::Arc;

use crate::handlers::admin_relay::AdminRelay;
use crate::llm::Provider;

/// Dependencies injected into every handler through dptree. There is no
/// per-chat mutable state; the conversation surface itself carries the state
/// machine, so concurrent chats cannot interfere.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<Provider>,
    pub relay: Arc<AdminRelay>,
}

impl AppState {
    pub fn new(provider: Provider, relay: AdminRelay) -> Self {
        AppState {
            provider: Arc::new(provider),
            relay: Arc::new(relay),
        }
    }
}
