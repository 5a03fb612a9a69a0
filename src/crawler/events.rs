//! Completion event delivery
//!
//! Every subscriber gets its own unbounded channel, so publishing never
//! blocks a worker and no event is dropped for a slow consumer.

use crate::crawler::ProcessedPage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Default)]
struct Subscribers {
    senders: Vec<UnboundedSender<Arc<ProcessedPage>>>,
    closed: bool,
}

/// Fan-out of completion events to subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Subscribers>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new subscriber
    ///
    /// Subscribers only see events published after they subscribe. A stream
    /// taken after the bus closed ends immediately.
    pub fn subscribe(&self) -> CompletionStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.lock();
        if !subscribers.closed {
            subscribers.senders.push(tx);
        }
        CompletionStream { receiver: rx }
    }

    /// Delivers an event to every live subscriber
    ///
    /// Subscribers whose stream has been dropped are pruned.
    pub fn publish(&self, page: Arc<ProcessedPage>) {
        self.lock()
            .senders
            .retain(|tx| tx.send(page.clone()).is_ok());
    }

    /// Ends every stream once the already-published events are consumed
    pub fn close(&self) {
        let mut subscribers = self.lock();
        subscribers.closed = true;
        subscribers.senders.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }
}

/// A subscriber's view of completion events, in publish order
#[derive(Debug)]
pub struct CompletionStream {
    receiver: UnboundedReceiver<Arc<ProcessedPage>>,
}

impl CompletionStream {
    /// Waits for the next event
    ///
    /// Returns None after the crawl has completed and every event was read.
    pub async fn recv(&mut self) -> Option<Arc<ProcessedPage>> {
        self.receiver.recv().await
    }

    /// Returns the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<Arc<ProcessedPage>> {
        match self.receiver.try_recv() {
            Ok(page) => Some(page),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every event queued so far
    pub fn drain(&mut self) -> Vec<Arc<ProcessedPage>> {
        let mut pages = Vec::new();
        while let Some(page) = self.try_recv() {
            pages.push(page);
        }
        pages
    }
}
