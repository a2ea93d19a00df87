use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::domain::models::{item::Item, source::Source};

#[derive(Debug, PartialEq, Eq)]
pub enum RemoveResult {
    Removed,
    NotFound,
}

/// Items of one source waiting for delivery, oldest first.
///
/// Written by that source's subscriber and drained by the flush scheduler.
#[derive(Debug)]
pub struct ItemQueue {
    source: Source,
    items: Mutex<VecDeque<Item>>,
}

impl ItemQueue {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub async fn enqueue(&self, item: Item) {
        let mut items = self.items.lock().await;
        items.push_back(item);
        tracing::debug!(source = %self.source, queue_depth = items.len(), "Item queued");
    }

    pub async fn peek_oldest(&self) -> Option<Item> {
        self.items.lock().await.front().cloned()
    }

    /// Removes the head, but only if it is still the item captured at `timestamp`.
    pub async fn remove_oldest(&self, timestamp: i64) -> RemoveResult {
        let mut items = self.items.lock().await;
        match items.front() {
            Some(head) if head.timestamp == timestamp => {
                items.pop_front();
                RemoveResult::Removed
            }
            _ => RemoveResult::NotFound,
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}
