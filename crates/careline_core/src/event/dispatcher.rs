//! Event dispatcher handles.
//!
//! Dispatchers are passed explicitly to stores; there is no process-wide bus.

use crate::event::change::ChangeEvent;
use log::{debug, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// Outbound port for change events. Fire-and-forget.
pub trait EventDispatcher: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

/// Hands events to a single in-process subscriber over a channel.
///
/// A gone subscriber is logged and otherwise ignored.
#[derive(Debug)]
pub struct ChannelDispatcher {
    sender: Sender<ChangeEvent>,
}

impl ChannelDispatcher {
    /// Creates a dispatcher and the receiver its subscriber drains.
    pub fn new() -> (Self, Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl EventDispatcher for ChannelDispatcher {
    fn publish(&self, event: ChangeEvent) {
        let kind = event.entity_kind().to_string();
        let id = event.entity_id();
        let op = event.op().as_str();
        match self.sender.send(event) {
            Ok(()) => debug!(
                "event=change_publish module=event status=ok kind={} id={} op={}",
                kind, id, op
            ),
            Err(_) => warn!(
                "event=change_publish module=event status=dropped reason=subscriber_gone kind={} id={} op={}",
                kind, id, op
            ),
        }
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of events published so far, oldest first.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drains recorded events.
    pub fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn publish(&self, event: ChangeEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl EventDispatcher for NoopDispatcher {
    fn publish(&self, _event: ChangeEvent) {}
}
