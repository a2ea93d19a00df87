use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;

use crate::{
    application::item_queue::ItemQueue,
    common::{configuration::ReconnectPolicy, errors::ConnectionError},
    domain::models::{item::Item, source::Source},
};

/// Receives every chunk read from a stream, in arrival order.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn on_chunk(&self, chunk: Bytes);
}

#[async_trait]
impl ChunkSink for ItemQueue {
    async fn on_chunk(&self, chunk: Bytes) {
        self.enqueue(Item::captured_now(chunk)).await;
    }
}

/// Hands each chunk to `sink` and waits for it before reading the next one.
///
/// Returns how many chunks were relayed once the stream ends.
pub async fn pump_chunks<S>(
    endpoint: &str,
    stream: S,
    sink: &dyn ChunkSink,
) -> Result<usize, ConnectionError>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    let mut stream = Box::pin(stream);
    let mut relayed = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| ConnectionError::Interrupted {
            endpoint: endpoint.to_string(),
            source,
        })?;
        tracing::debug!(%endpoint, chunk = %String::from_utf8_lossy(&chunk));
        sink.on_chunk(chunk).await;
        relayed += 1;
    }

    Ok(relayed)
}

#[tracing::instrument(name = "Subscribing to stream", skip(client, sink))]
pub async fn subscribe(
    client: &Client,
    endpoint: &str,
    sink: &dyn ChunkSink,
) -> Result<usize, ConnectionError> {
    let response = client
        .get(endpoint)
        .send()
        .await
        .map_err(|source| ConnectionError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(ConnectionError::Status {
            endpoint: endpoint.to_string(),
            status: response.status(),
        });
    }

    pump_chunks(endpoint, response.bytes_stream(), sink).await
}

/// Keeps one source's stream feeding its sink.
pub struct StreamSubscriber {
    source: Source,
    endpoint: String,
    client: Client,
    sink: Arc<dyn ChunkSink>,
    reconnect: ReconnectPolicy,
    reconnect_delay: Duration,
}

impl StreamSubscriber {
    pub fn new(source: Source, endpoint: String, client: Client, sink: Arc<dyn ChunkSink>) -> Self {
        Self {
            source,
            endpoint,
            client,
            sink,
            reconnect: ReconnectPolicy::Never,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy, delay: Duration) -> Self {
        self.reconnect = reconnect;
        self.reconnect_delay = delay;
        self
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Runs until the stream ends or fails. Under `ReconnectPolicy::Always` this never returns.
    pub async fn run(&self) -> Result<(), ConnectionError> {
        loop {
            let outcome = subscribe(&self.client, &self.endpoint, self.sink.as_ref()).await;

            match &outcome {
                Ok(chunks) => {
                    tracing::info!(source = %self.source, chunks, "stream done");
                }
                Err(err) => {
                    tracing::error!(source = %self.source, error = %err, "Stream subscription failed");
                }
            }

            if self.reconnect == ReconnectPolicy::Never {
                return outcome.map(|_| ());
            }

            tracing::info!(
                source = %self.source,
                delay = ?self.reconnect_delay,
                "Reconnecting to stream"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }
}
