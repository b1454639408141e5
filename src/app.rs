use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::pool::SessionPool;
use crate::scheduler::InputScheduler;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Process-wide context handed to every request handler
pub struct BridgeApp {
    name: String,
    started: Instant,
    scheduler: InputScheduler,
}

impl BridgeApp {
    /// Bring up the controller pool described by `config`
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let pool = SessionPool::initialize(config.controllers, config.backend)?;
        log::info!("{} virtual controller(s) ready", pool.count());
        Ok(Self::with_pool(config.name.clone(), pool))
    }

    pub fn with_pool(name: String, pool: SessionPool) -> Self {
        Self {
            name,
            started: Instant::now(),
            scheduler: InputScheduler::new(Arc::new(pool)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn scheduler(&self) -> &InputScheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &SessionPool {
        self.scheduler.pool()
    }

    /// Neutralise and release every controller
    pub fn shutdown(&self) {
        self.pool().teardown();
        log::info!("Controllers released");
    }
}
