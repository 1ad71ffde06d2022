//! Event-driven background work: the bounded worker pool, the event bus, and the handlers that
//! keep feeds and hotness scores up to date.

pub mod bus;
pub mod dispatcher;
pub mod events;
pub mod pool;
pub mod recalculator;

pub use bus::{EventBus, InMemoryEventBus, Subscription};
pub use dispatcher::{handle_event, EventDispatcher};
pub use events::{
    ChangeKind, CommentEvent, DomainEvent, EventMessage, PostDeleted, PostPublished, VoteEvent,
};
pub use pool::{install_panic_hook, PoolStats, WorkerPool};
pub use recalculator::HotnessRecalculator;

use agora_core::CoreError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct BackgroundService {
    dispatcher: Arc<EventDispatcher>,
    shutdown_timeout: Duration,
    consumers: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundService {
    pub fn new(dispatcher: EventDispatcher, shutdown_timeout: Duration) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            shutdown_timeout,
            consumers: Mutex::new(Vec::new()),
        }
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub async fn start(&self) -> Result<(), CoreError> {
        let handles = self.dispatcher.start().await?;
        self.consumers.lock().await.extend(handles);
        info!("Background service started");
        Ok(())
    }

    /// Shut the pool down, waiting at most the configured drain timeout. Returns false if tasks
    /// had to be abandoned.
    pub async fn stop(&self) -> bool {
        let drained = self
            .dispatcher
            .pool()
            .shutdown(Some(self.shutdown_timeout))
            .await;

        for handle in self.consumers.lock().await.drain(..) {
            if let Err(e) = handle.await {
                warn!("Event consumer ended abnormally: {}", e);
            }
        }

        info!("Background service stopped: {:?}", self.stats());
        drained
    }

    pub fn stats(&self) -> PoolStats {
        self.dispatcher.pool().stats()
    }
}
