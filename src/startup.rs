use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use reqwest::Client;
use tokio::task::JoinSet;

use crate::{
    application::{
        flush_scheduler::{Binding, FlushScheduler},
        item_queue::ItemQueue,
    },
    common::{configuration::Settings, errors::RelayError},
    domain::models::source::Source,
    infrastructure::{
        stream::{ChunkSink, StreamSubscriber},
        webhook::WebhookClient,
    },
};

type TaskOutcome = (String, Result<(), RelayError>);

/// The two subscribers and the flush scheduler, wired to shared queues.
pub struct Application {
    log_queue: Arc<ItemQueue>,
    events_queue: Arc<ItemQueue>,
    subscribers: Vec<StreamSubscriber>,
    scheduler: FlushScheduler,
}

impl Application {
    pub fn build(settings: Settings) -> Result<Self, RelayError> {
        settings.validate()?;

        let client = Client::new();
        let log_queue = Arc::new(ItemQueue::new(Source::Log));
        let events_queue = Arc::new(ItemQueue::new(Source::Events));

        let mut subscribers = Vec::with_capacity(Source::ALL.len());
        let mut bindings = Vec::with_capacity(Source::ALL.len());
        for source in Source::ALL {
            let source_settings = settings.source(source);
            let queue = match source {
                Source::Log => Arc::clone(&log_queue),
                Source::Events => Arc::clone(&events_queue),
            };

            let subscriber = StreamSubscriber::new(
                source,
                source_settings.stream_url(&settings.mirakurun.url),
                client.clone(),
                Arc::clone(&queue) as Arc<dyn ChunkSink>,
            )
            .with_reconnect(settings.relay.reconnect, settings.relay.reconnect_delay());
            subscribers.push(subscriber);

            bindings.push(Binding {
                queue,
                webhook_url: source_settings.webhook_url.clone(),
                username: source_settings.username.clone(),
            });
        }

        let scheduler = FlushScheduler::new(
            bindings,
            Arc::new(WebhookClient::new(client)),
            settings.relay.flush_interval(),
            settings.relay.max_content_length,
        );

        Ok(Self {
            log_queue,
            events_queue,
            subscribers,
            scheduler,
        })
    }

    pub fn queue(&self, source: Source) -> Arc<ItemQueue> {
        match source {
            Source::Log => Arc::clone(&self.log_queue),
            Source::Events => Arc::clone(&self.events_queue),
        }
    }

    /// Runs every task until all of them have ended. A failing task is logged and never
    /// takes the others down.
    pub async fn run_until_stopped(self) -> Result<(), RelayError> {
        let mut tasks = JoinSet::new();

        for subscriber in self.subscribers {
            let name = format!("{} subscriber", subscriber.source());
            supervise(&mut tasks, name, async move {
                subscriber.run().await.map_err(RelayError::from)
            });
        }

        let scheduler = self.scheduler;
        supervise(&mut tasks, "flush scheduler".to_string(), async move {
            scheduler.run().await;
            Ok(())
        });

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => tracing::info!(task = %name, "Relay task finished"),
                Ok((name, Err(err))) => {
                    tracing::error!(task = %name, error = %err, "Relay task failed")
                }
                Err(err) => tracing::error!(error = %err, "Relay task could not be joined"),
            }
        }

        Ok(())
    }
}

fn supervise<F>(tasks: &mut JoinSet<TaskOutcome>, name: String, task: F)
where
    F: Future<Output = Result<(), RelayError>> + Send + 'static,
{
    tracing::info!(task = %name, "Starting relay task");
    tasks.spawn(async move {
        let outcome = match AssertUnwindSafe(task).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => Err(RelayError::TaskPanicked(name.clone())),
        };
        (name, outcome)
    });
}
