//! Application state management
//!
//! Shared state passed to all request handlers via Axum's State extractor.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::db::Store;
use crate::judge::{Dispatcher, SandboxRunner};
use crate::services::registry::ContestRegistry;
use crate::ws::Broadcaster;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    store: Store,
    registry: ContestRegistry,
    broadcaster: Broadcaster,
    dispatcher: Dispatcher,
    sandbox: SandboxRunner,
    /// Slots shared by the worker pool and the admin trial run; its size is
    /// the same `W` as the pool
    sandbox_slots: Arc<Semaphore>,
    config: Config,
}

impl AppState {
    pub fn new(
        store: Store,
        dispatcher: Dispatcher,
        sandbox: SandboxRunner,
        config: Config,
    ) -> Self {
        let sandbox_slots = Arc::new(Semaphore::new(config.judge.max_checks));
        Self {
            inner: Arc::new(AppStateInner {
                store,
                registry: ContestRegistry::new(),
                broadcaster: Broadcaster::new(),
                dispatcher,
                sandbox,
                sandbox_slots,
                config,
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn registry(&self) -> &ContestRegistry {
        &self.inner.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn sandbox(&self) -> &SandboxRunner {
        &self.inner.sandbox
    }

    pub fn sandbox_slots(&self) -> &Semaphore {
        &self.inner.sandbox_slots
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}
