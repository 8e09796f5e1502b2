//! Lifecycle event sink
//!
//! Adapters report connection lifecycle and driver failures through an
//! injected [`EventSink`] instead of writing to global logging state.

use std::sync::Arc;

use crate::BackendKind;

/// What happened to a backend adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEventKind {
    Connected,
    Disconnected,
    /// A driver call failed; carries the rendered error
    Error(String),
}

/// A single lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEvent {
    pub backend: BackendKind,
    pub kind: AdapterEventKind,
}

impl AdapterEvent {
    pub fn connected(backend: BackendKind) -> Self {
        Self {
            backend,
            kind: AdapterEventKind::Connected,
        }
    }

    pub fn disconnected(backend: BackendKind) -> Self {
        Self {
            backend,
            kind: AdapterEventKind::Disconnected,
        }
    }

    pub fn error(backend: BackendKind, message: impl Into<String>) -> Self {
        Self {
            backend,
            kind: AdapterEventKind::Error(message.into()),
        }
    }
}

/// Receiver for adapter lifecycle events
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &AdapterEvent);
}

/// Default sink that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_event(&self, event: &AdapterEvent) {
        match &event.kind {
            AdapterEventKind::Connected => {
                tracing::info!(backend = %event.backend, "Backend connected")
            }
            AdapterEventKind::Disconnected => {
                tracing::info!(backend = %event.backend, "Backend disconnected")
            }
            AdapterEventKind::Error(message) => {
                tracing::error!(backend = %event.backend, error = %message, "Backend error")
            }
        }
    }
}

/// Shared handle to the default sink
pub fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingEventSink)
}
