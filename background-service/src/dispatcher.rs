use agora_core::{CoreError, ErrorExt, ErrorReporter};
use feed_engine::FeedService;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, Subscription};
use crate::events::{DomainEvent, EventMessage, ALL_TOPICS};
use crate::pool::WorkerPool;
use crate::recalculator::HotnessRecalculator;

/// Routes transport messages to feed distribution and score recalculation.
///
/// One consumer loop runs per topic. Each message is decoded on the consumer loop and handled as
/// a unit of work on the [`WorkerPool`], so slow handlers never hold up the transport.
#[derive(Debug)]
pub struct EventDispatcher {
    bus: Arc<dyn EventBus>,
    pool: WorkerPool,
    feeds: FeedService,
    recalculator: HotnessRecalculator,
    reporter: ErrorReporter,
}

impl EventDispatcher {
    pub fn new(
        bus: Arc<dyn EventBus>,
        pool: WorkerPool,
        feeds: FeedService,
        recalculator: HotnessRecalculator,
    ) -> Self {
        Self {
            bus,
            pool,
            feeds,
            recalculator,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Subscribe to every topic and start the consumer loops. They stop when the pool shuts down
    /// or the bus closes.
    pub async fn start(self: &Arc<Self>) -> Result<Vec<JoinHandle<()>>, CoreError> {
        let mut handles = Vec::with_capacity(ALL_TOPICS.len());
        for topic in ALL_TOPICS {
            let subscription = self.bus.subscribe(topic).await?;
            let dispatcher = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                dispatcher.consume(subscription).await;
            }));
        }
        info!("Event dispatcher listening on {} topics", ALL_TOPICS.len());
        Ok(handles)
    }

    async fn consume(&self, mut subscription: Subscription) {
        let shutdown = self.pool.shutdown_token();
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                message = subscription.next() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            if let Err(e) = self.dispatch(message) {
                self.reporter.report_error(&e);
            }
        }
        debug!("Consumer for {} stopped", subscription.topic());
    }

    /// Decode `message` and queue its handler on the pool.
    ///
    /// Malformed payloads fail here and are not queued; redelivery is up to the transport.
    pub fn dispatch(&self, message: EventMessage) -> Result<(), CoreError> {
        let event = DomainEvent::decode(&message)?;
        debug!("Dispatching {} message {}", message.topic, message.id);
        let feeds = self.feeds.clone();
        let recalculator = self.recalculator.clone();

        let task_name = format!("{}:{}", message.topic, message.id);
        self.pool.submit(task_name, move |token| async move {
            handle_event(&feeds, &recalculator, &event, &token).await
        })
    }
}

/// Apply one decoded event.
pub async fn handle_event(
    feeds: &FeedService,
    recalculator: &HotnessRecalculator,
    event: &DomainEvent,
    token: &CancellationToken,
) -> Result<(), CoreError> {
    match event {
        DomainEvent::PostPublished(published) => {
            feeds
                .push_to_follower_feeds(published.post_id, published.author_id)
                .await?;
        }
        DomainEvent::PostDeleted(deleted) => {
            feeds.remove_from_feeds(deleted.post_id).await?;
        }
        DomainEvent::Vote(..) | DomainEvent::Comment(..) => {
            if let Some(outcome) = recalculator.handle(event, token).await? {
                for failure in outcome.side_effects() {
                    warn!(
                        "Post score persisted but {} failed: {}",
                        failure.effect,
                        failure.error.user_friendly_message()
                    );
                }
            }
        }
    }
    Ok(())
}
