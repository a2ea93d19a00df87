use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use secrecy::{ExposeSecret, Secret};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::{
    application::item_queue::{ItemQueue, RemoveResult},
    infrastructure::webhook::Notifier,
};

/// Where one queue's items are posted, and under which name.
#[derive(Debug, Clone)]
pub struct Binding {
    pub queue: Arc<ItemQueue>,
    pub webhook_url: Secret<String>,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was waiting.
    Empty,
    Delivered,
    /// The head had no text to post and was dropped.
    Skipped,
    /// Delivery failed; the head stays for the next tick.
    Retained,
}

/// Posts at most one item per binding every interval.
#[derive(Debug)]
pub struct FlushScheduler {
    bindings: Vec<Binding>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    max_content_length: usize,
}

impl FlushScheduler {
    pub fn new(
        bindings: Vec<Binding>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        max_content_length: usize,
    ) -> Self {
        Self {
            bindings,
            notifier,
            interval,
            max_content_length,
        }
    }

    /// Ticks forever, each binding on its own clock so a webhook that never answers only
    /// stalls its own queue.
    pub async fn run(&self) {
        join_all(self.bindings.iter().map(|binding| self.run_binding(binding))).await;
    }

    /// The first tick fires one interval after the call, and a tick that overruns the
    /// interval pushes the following ones back instead of overlapping them.
    async fn run_binding(&self, binding: &Binding) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.drain_one(binding).await;
        }
    }

    /// Drains one item from every binding. Outcomes follow binding order.
    pub async fn tick(&self) -> Vec<DrainOutcome> {
        join_all(self.bindings.iter().map(|binding| self.drain_one(binding))).await
    }

    async fn drain_one(&self, binding: &Binding) -> DrainOutcome {
        let source = binding.queue.source();
        let item = match binding.queue.peek_oldest().await {
            Some(item) => item,
            None => return DrainOutcome::Empty,
        };
        let queue_depth = binding.queue.len().await;
        tracing::info!(
            %source,
            timestamp = item.timestamp,
            queue_depth,
            "Flushing oldest item"
        );

        let content = match item.message_text(self.max_content_length) {
            Some(content) => content,
            None => {
                binding.queue.remove_oldest(item.timestamp).await;
                tracing::debug!(%source, timestamp = item.timestamp, "Dropped blank item");
                return DrainOutcome::Skipped;
            }
        };

        match self
            .notifier
            .send(
                binding.webhook_url.expose_secret(),
                &binding.username,
                &content,
            )
            .await
        {
            Ok(()) => {
                if binding.queue.remove_oldest(item.timestamp).await == RemoveResult::NotFound {
                    tracing::warn!(
                        %source,
                        timestamp = item.timestamp,
                        "Delivered item was no longer at the head of its queue"
                    );
                }
                DrainOutcome::Delivered
            }
            Err(err) => {
                tracing::warn!(
                    %source,
                    timestamp = item.timestamp,
                    error = %err,
                    "Delivery failed, keeping item for the next tick"
                );
                DrainOutcome::Retained
            }
        }
    }
}
