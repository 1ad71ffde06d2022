use agora_core::{CoreError, EventError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::events::EventMessage;

/// Publish/subscribe by topic. Delivery is at-least-once; redelivery is the transport's concern.
#[async_trait]
pub trait EventBus: Debug + Send + Sync {
    async fn publish(&self, message: EventMessage) -> Result<(), CoreError>;

    async fn subscribe(&self, topic: &str) -> Result<Subscription, CoreError>;
}

#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: mpsc::UnboundedReceiver<EventMessage>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The next message, or `None` once the bus has been closed.
    pub async fn next(&mut self) -> Option<EventMessage> {
        self.receiver.recv().await
    }
}

/// Single-process bus. Every subscriber of a topic receives every message published to it.
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<EventMessage>>>>,
    closed: AtomicBool,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends every subscription. Later publishes fail.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.lock().await.clear();
    }

    fn ensure_open(&self, topic: &str) -> Result<(), CoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EventError::TransportClosed {
                topic: topic.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, message: EventMessage) -> Result<(), CoreError> {
        self.ensure_open(&message.topic)?;

        let mut subscribers = self.subscribers.lock().await;
        let Some(senders) = subscribers.get_mut(&message.topic) else {
            debug!("No subscribers for {}, dropping message", message.topic);
            return Ok(());
        };

        senders.retain(|sender| sender.send(message.clone()).is_ok());
        debug!(
            "Published to {} ({} subscribers)",
            message.topic,
            senders.len()
        );
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, CoreError> {
        self.ensure_open(topic)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(sender);

        Ok(Subscription {
            topic: topic.to_string(),
            receiver,
        })
    }
}
