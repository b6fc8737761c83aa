//! Single-producer, multi-consumer fan-out of [`StreamEvent`]s.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::BoxStream;
use tokio::sync::Notify;

use crate::types::StreamEvent;

#[derive(Debug, Default)]
struct State {
    events: Vec<StreamEvent>,
    finished: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    notify: Notify,
}

/// Session-scoped event log that any number of subscribers read.
///
/// Every event is kept until the stream is dropped, so a subscriber attached
/// late replays from the first event. Publishing never waits on readers.
#[derive(Debug, Clone, Default)]
pub struct OutputStream {
    inner: Arc<Inner>,
}

impl OutputStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a reader panicked mid-read; the event
        // list itself is still consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an event. Ignored once the stream has finished.
    pub fn publish(&self, event: StreamEvent) {
        {
            let mut state = self.lock();
            if state.finished {
                return;
            }
            state.events.push(event);
        }
        self.inner.notify.notify_waiters();
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = StreamEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Emit [`StreamEvent::Done`] and close the stream. Returns `false` when
    /// it was already finished.
    pub fn finish(&self) -> bool {
        {
            let mut state = self.lock();
            if state.finished {
                return false;
            }
            state.events.push(StreamEvent::Done);
            state.finished = true;
        }
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Events published so far.
    pub fn snapshot(&self) -> Vec<StreamEvent> {
        self.lock().events.clone()
    }

    pub fn subscribe(&self) -> OutputSubscriber {
        OutputSubscriber {
            stream: self.clone(),
            cursor: 0,
        }
    }

    /// Guard that finishes the stream when dropped, including during unwinding.
    pub fn finish_guard(&self) -> FinishGuard {
        FinishGuard(self.clone())
    }
}

/// Finishes its [`OutputStream`] on drop.
#[derive(Debug)]
#[must_use = "the stream is finished as soon as the guard is dropped"]
pub struct FinishGuard(OutputStream);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Independent reader over an [`OutputStream`].
#[derive(Debug)]
pub struct OutputSubscriber {
    stream: OutputStream,
    cursor: usize,
}

impl OutputSubscriber {
    /// Next event, or `None` after `Done` has been delivered.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        loop {
            let notified = self.stream.inner.notify.notified();
            {
                let state = self.stream.lock();
                if let Some(event) = state.events.get(self.cursor) {
                    self.cursor += 1;
                    return Some(event.clone());
                }
                if state.finished {
                    return None;
                }
            }
            notified.await;
        }
    }

    pub fn into_stream(mut self) -> BoxStream<'static, StreamEvent> {
        Box::pin(async_stream::stream! {
            while let Some(event) = self.next().await {
                yield event;
            }
        })
    }
}
