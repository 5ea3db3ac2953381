//! Per-tick input event queue.
//!
//! Events are produced by the edge detectors once per tick and consumed
//! by the mode dispatcher in FIFO order within the same tick.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Encoder     │────▶│              │     │              │
//! │ Touch pad   │────▶│  EventQueue  │────▶│  Dispatcher  │
//! │ Motion      │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The queue is owned by the application service, not a global, so tests
//! can inject events directly.

use heapless::Deque;

use crate::drivers::button::ButtonEvent;
use crate::drivers::touch::TouchEvent;
use crate::sensors::motion::MotionEvent;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// A discrete user-input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Main (encoder push) button gesture. `LongPressHold` is never queued.
    Button(ButtonEvent),
    /// Encoder rotation in detents (already acceleration-scaled),
    /// positive = clockwise.
    Rotate(i32),
    Touch(TouchEvent),
    Motion(MotionEvent),
}

impl InputEvent {
    /// Whether the event counts as user activity for the sleep timer.
    /// Sudden-movement noise doesn't.
    pub fn is_activity(&self) -> bool {
        match self {
            Self::Button(ev) => !matches!(ev, ButtonEvent::None),
            Self::Rotate(d) => *d != 0,
            Self::Touch(ev) => !matches!(ev, TouchEvent::None),
            Self::Motion(ev) => matches!(ev, MotionEvent::Shake),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Deque<InputEvent, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            inner: Deque::new(),
            dropped: 0,
        }
    }

    /// Push an event. Returns `false` if the queue is full (event dropped).
    pub fn push_event(&mut self, event: InputEvent) -> bool {
        if self.inner.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            log::warn!("EVENTS: queue full, dropped {:?}", event);
            return false;
        }
        true
    }

    pub fn pop_event(&mut self) -> Option<InputEvent> {
        self.inner.pop_front()
    }

    /// Drain all pending events into a callback in FIFO order.
    pub fn drain_events(&mut self, mut handler: impl FnMut(InputEvent)) {
        while let Some(event) = self.pop_event() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Total events lost to overflow since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
