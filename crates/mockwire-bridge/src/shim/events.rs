//! Event delivery for XHR-style handles.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReadyStateChange,
    Load,
    LoadEnd,
    Error,
    Abort,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ReadyStateChange => "readystatechange",
            EventKind::Load => "load",
            EventKind::LoadEnd => "loadend",
            EventKind::Error => "error",
            EventKind::Abort => "abort",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Listeners in registration order plus one `on<event>` slot per kind.
/// Dispatch runs listeners first, then the slot.
#[derive(Default)]
pub struct EventTarget {
    listeners: Mutex<Vec<(EventKind, Listener)>>,
    handlers: Mutex<HashMap<EventKind, Listener>>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, kind: EventKind, listener: Listener) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((kind, listener));
    }

    /// Replace (or clear) the single-slot handler.
    pub fn set_handler(&self, kind: EventKind, handler: Option<Listener>) {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        match handler {
            Some(h) => {
                handlers.insert(kind, h);
            }
            None => {
                handlers.remove(&kind);
            }
        }
    }

    pub fn dispatch(&self, kind: EventKind) {
        // Snapshot so a callback may register more listeners without deadlocking.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned();

        let event = Event { kind };
        for l in listeners {
            l(&event);
        }
        if let Some(h) = handler {
            h(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn listeners_then_handler() {
        let target = EventTarget::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        target.set_handler(EventKind::Load, Some(Arc::new(move |_: &Event| s.lock().unwrap().push("onload"))));
        let s = Arc::clone(&seen);
        target.add_listener(EventKind::Load, Arc::new(move |_: &Event| s.lock().unwrap().push("first")));
        let s = Arc::clone(&seen);
        target.add_listener(EventKind::Load, Arc::new(move |_: &Event| s.lock().unwrap().push("second")));
        let s = Arc::clone(&seen);
        target.add_listener(EventKind::Error, Arc::new(move |_: &Event| s.lock().unwrap().push("error")));

        target.dispatch(EventKind::Load);
        assert_eq!(*seen.lock().unwrap(), ["first", "second", "onload"]);
    }
}
