//! Background section loading.
//!
//! A single worker thread fetches sections in submission order and reports
//! progress over a channel that the UI polls every frame. Processing is
//! strictly sequential, so loads submitted in panel order also complete in
//! panel order.

use super::{ContentSource, SectionContent};
use crate::error::{Error, Result};
use log::{debug, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// A request to load one section into one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Panel position
    pub panel: usize,
    /// Panel load generation this request belongs to
    pub generation: u64,
    /// Section reference to fetch
    pub reference: String,
}

impl LoadRequest {
    /// Fetch and prepare the section on the calling thread.
    pub fn run(self, source: &dyn ContentSource) -> LoadOutcome {
        let result = source
            .fetch(&self.reference)
            .map(|markup| SectionContent::from_markup(&markup));
        LoadOutcome {
            panel: self.panel,
            generation: self.generation,
            reference: self.reference,
            result,
        }
    }
}

/// Result of a load request.
#[derive(Debug)]
pub struct LoadOutcome {
    pub panel: usize,
    pub generation: u64,
    pub reference: String,
    pub result: Result<SectionContent>,
}

/// Progress reported by the loader.
#[derive(Debug)]
pub enum LoadEvent {
    /// The worker began fetching
    Started { panel: usize, generation: u64 },
    /// The fetch completed, successfully or not
    Finished(LoadOutcome),
}

type Notifier = Box<dyn Fn() + Send>;

/// Owns the loader worker thread.
///
/// Dropping the loader closes the request channel; the worker exits after
/// the request it is currently serving.
pub struct SectionLoader {
    sender: Sender<LoadRequest>,
    receiver: Receiver<LoadEvent>,
}

impl SectionLoader {
    /// Spawn a worker serving requests from `source`.
    #[cfg(test)]
    pub fn spawn(source: Arc<dyn ContentSource>) -> Result<Self> {
        Self::spawn_with_notifier(source, None)
    }

    /// Spawn a worker that calls `notify` after each event, e.g. to wake the
    /// UI.
    pub fn spawn_with_notifier(
        source: Arc<dyn ContentSource>,
        notify: Option<Notifier>,
    ) -> Result<Self> {
        let (request_tx, request_rx) = channel::<LoadRequest>();
        let (event_tx, event_rx) = channel::<LoadEvent>();

        thread::Builder::new()
            .name("section-loader".to_string())
            .spawn(move || {
                let send = |event: LoadEvent| -> bool {
                    let delivered = event_tx.send(event).is_ok();
                    if let Some(notify) = &notify {
                        notify();
                    }
                    delivered
                };

                for request in request_rx {
                    debug!(
                        "Loading '{}' into panel {} (generation {})",
                        request.reference, request.panel, request.generation
                    );
                    if !send(LoadEvent::Started {
                        panel: request.panel,
                        generation: request.generation,
                    }) {
                        break;
                    }
                    let outcome = request.run(source.as_ref());
                    if let Err(err) = &outcome.result {
                        warn!("Loading '{}' failed: {}", outcome.reference, err);
                    }
                    if !send(LoadEvent::Finished(outcome)) {
                        break;
                    }
                }
                debug!("Section loader stopped");
            })
            .map_err(Error::Io)?;

        Ok(Self {
            sender: request_tx,
            receiver: event_rx,
        })
    }

    /// Queue a request. Returns `false` if the worker has stopped.
    pub fn submit(&self, request: LoadRequest) -> bool {
        self.sender.send(request).is_ok()
    }

    /// Queue several requests, preserving their order.
    pub fn submit_all(&self, requests: impl IntoIterator<Item = LoadRequest>) -> bool {
        requests.into_iter().all(|request| self.submit(request))
    }

    /// Collect all events delivered since the last poll. Never blocks.
    pub fn poll_events(&self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait up to `timeout` for the next event.
    #[cfg(test)]
    pub fn next_event(&self, timeout: std::time::Duration) -> Option<LoadEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
