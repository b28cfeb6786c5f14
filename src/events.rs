//! Host event protocol
//!
//! Outcomes of the loading pipeline, and the renderer's own notifications, are
//! translated into named events with a small JSON payload and handed to an
//! injected [`HostNotifier`].

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// Identifier of the view instance that emits an event
pub type ViewId = u64;

pub const EVENT_ON_LOAD: &str = "onLoadSuccess";
pub const EVENT_ON_ERROR: &str = "onErrorRaised";
pub const EVENT_ON_PAGE_CHANGED: &str = "onPageChanged";

/// Event delivered to the containing application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    LoadSuccess,
    Error { message: String },
    PageChanged { page: u32, page_count: u32 },
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PagePayload {
    page: u32,
    page_count: u32,
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::LoadSuccess => EVENT_ON_LOAD,
            HostEvent::Error { .. } => EVENT_ON_ERROR,
            HostEvent::PageChanged { .. } => EVENT_ON_PAGE_CHANGED,
        }
    }

    pub fn payload(&self) -> Value {
        let payload = match self {
            HostEvent::LoadSuccess => serde_json::to_value(serde_json::Map::new()),
            HostEvent::Error { message } => serde_json::to_value(MessagePayload { message }),
            HostEvent::PageChanged { page, page_count } => serde_json::to_value(PagePayload {
                page: *page,
                page_count: *page_count,
            }),
        };
        payload.unwrap_or(Value::Null)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, HostEvent::PageChanged { .. })
    }
}

/// Capability for delivering a named event to the host
pub trait HostNotifier: Send + Sync {
    fn notify(&self, view_id: ViewId, event_name: &str, payload: Value);
}

/// Emits [`HostEvent`]s on behalf of one view
#[derive(Clone)]
pub struct EventEmitter {
    view_id: ViewId,
    notifier: Arc<dyn HostNotifier>,
}

impl EventEmitter {
    pub fn new(view_id: ViewId, notifier: Arc<dyn HostNotifier>) -> Self {
        Self { view_id, notifier }
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn emit(&self, event: HostEvent) {
        tracing::debug!(view_id = self.view_id, event = event.name(), "Emitting host event");
        self.notifier
            .notify(self.view_id, event.name(), event.payload());
    }

    pub fn load_success(&self) {
        self.emit(HostEvent::LoadSuccess);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(HostEvent::Error {
            message: message.into(),
        });
    }

    pub fn page_changed(&self, page: u32, page_count: u32) {
        self.emit(HostEvent::PageChanged { page, page_count });
    }
}

/// One delivered event, as seen by a [`MemoryNotifier`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub view_id: ViewId,
    pub name: String,
    pub payload: Value,
}

/// Notifier that keeps every event in memory
///
/// Useful for hosts that poll for events and for tests.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl HostNotifier for MemoryNotifier {
    fn notify(&self, view_id: ViewId, event_name: &str, payload: Value) {
        self.events.lock().push(RecordedEvent {
            view_id,
            name: event_name.to_string(),
            payload,
        });
    }
}
