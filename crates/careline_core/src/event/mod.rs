//! Change notifications for the external search index.
//!
//! # Responsibility
//! - Define the immutable `ChangeEvent` handed to index subscribers.
//! - Decide, per entity kind, which writes are notable (`Notifier`).
//! - Hand events to an explicitly injected `EventDispatcher`.
//!
//! # Invariants
//! - Publishing never waits on a subscriber.
//! - Publishing never fails the write that produced the event.

pub mod change;
pub mod dispatcher;
pub mod notifier;
