//! Key event sources.
//!
//! The engine does not hook the keyboard itself. Whatever produces key events
//! (a window's event loop, a global hook, a terminal) implements
//! [`InputSource`] and calls the registered handler for each event, in order.

use crate::keymap::KeyPhase;
use std::collections::BTreeMap;

/// A key event as delivered by the platform, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub code: String,
    pub phase: KeyPhase,
}

impl RawKeyEvent {
    pub fn press(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            phase: KeyPhase::Press,
        }
    }

    pub fn release(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            phase: KeyPhase::Release,
        }
    }
}

pub type KeyHandler = Box<dyn FnMut(&RawKeyEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Something that delivers key events to registered handlers.
pub trait InputSource {
    fn register(&mut self, handler: KeyHandler) -> SubscriptionId;

    /// Returns false if `id` was not registered.
    fn unregister(&mut self, id: SubscriptionId) -> bool;
}

/// Input source driven by explicit calls to [`dispatch`](Self::dispatch).
///
/// Used when the host application already receives key events and just
/// forwards them, and in tests.
#[derive(Default)]
pub struct ManualInput {
    next_id: u64,
    handlers: BTreeMap<SubscriptionId, KeyHandler>,
}

impl ManualInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every registered handler, oldest first.
    pub fn dispatch(&mut self, event: &RawKeyEvent) {
        for handler in self.handlers.values_mut() {
            handler(event);
        }
    }

    /// Press followed by release of the same key.
    pub fn tap(&mut self, code: &str) {
        self.dispatch(&RawKeyEvent::press(code));
        self.dispatch(&RawKeyEvent::release(code));
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl InputSource for ManualInput {
    fn register(&mut self, handler: KeyHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, handler);
        id
    }

    fn unregister(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id).is_some()
    }
}
