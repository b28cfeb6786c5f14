//! Renderer capability
//!
//! The loader never draws pages itself. It resolves a [`DocumentSource`], builds
//! a [`LoadRequest`] with the presentation defaults and forwarding callbacks, and
//! hands it to a [`Renderer`]. The renderer reports load completion, errors and
//! page changes asynchronously through those callbacks.

use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Presentation;
use crate::events::EventEmitter;

/// Resolved document bytes, ready for handoff
pub enum DocumentSource {
    /// Readable stream over a file or bundled asset
    Stream(Box<dyn Read + Send>),
    /// Decoded in-memory payload
    Bytes(Vec<u8>),
}

impl DocumentSource {
    /// Drain the source into memory
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            DocumentSource::Bytes(bytes) => Ok(bytes),
            DocumentSource::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Stream(_) => f.write_str("DocumentSource::Stream"),
            DocumentSource::Bytes(bytes) => write!(f, "DocumentSource::Bytes({} bytes)", bytes.len()),
        }
    }
}

pub type OnLoad = Box<dyn Fn(u32) + Send + Sync>;
pub type OnError = Box<dyn Fn(&dyn std::error::Error) + Send + Sync>;
pub type OnPageChange = Box<dyn Fn(u32, u32) + Send + Sync>;

/// Chainable renderer configuration, consumed by [`Renderer::load`]
pub struct LoadRequest {
    pub source: DocumentSource,
    pub default_page: u32,
    pub swipe_horizontal: bool,
    pub spacing: u32,
    pub fade_in_duration: u32,
    pub on_load: Option<OnLoad>,
    pub on_error: Option<OnError>,
    pub on_page_change: Option<OnPageChange>,
}

impl LoadRequest {
    pub fn from_source(source: DocumentSource) -> Self {
        Self {
            source,
            default_page: 0,
            swipe_horizontal: false,
            spacing: 0,
            fade_in_duration: 0,
            on_load: None,
            on_error: None,
            on_page_change: None,
        }
    }

    pub fn default_page(mut self, page: u32) -> Self {
        self.default_page = page;
        self
    }

    pub fn swipe_horizontal(mut self, horizontal: bool) -> Self {
        self.swipe_horizontal = horizontal;
        self
    }

    pub fn spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    /// Fade-in duration in milliseconds, applied by the renderer after load
    pub fn fade_in_duration(mut self, millis: u32) -> Self {
        self.fade_in_duration = millis;
        self
    }

    pub fn presentation(self, presentation: Presentation) -> Self {
        self.default_page(presentation.initial_page)
            .swipe_horizontal(presentation.swipe_horizontal)
            .spacing(presentation.spacing)
    }

    pub fn on_load(mut self, f: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&dyn std::error::Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_page_change(mut self, f: impl Fn(u32, u32) + Send + Sync + 'static) -> Self {
        self.on_page_change = Some(Box::new(f));
        self
    }

    /// Wire all three callbacks to a host emitter
    ///
    /// `on_load` and `on_error` share `latch`: only the first of them reaches the
    /// host, and none do once the latch was closed by a newer dispatch.
    pub fn forward_to(self, emitter: &EventEmitter, latch: TerminalLatch) -> Self {
        let load_emitter = emitter.clone();
        let load_latch = latch.clone();
        let error_emitter = emitter.clone();
        let page_emitter = emitter.clone();

        self.on_load(move |page_count| {
            if load_latch.try_fire() {
                tracing::debug!(page_count, "Renderer reported load complete");
                load_emitter.load_success();
            }
        })
        .on_error(move |cause| {
            if latch.try_fire() {
                error_emitter.error(format!("error: {}", cause));
            }
        })
        .on_page_change(move |page, page_count| {
            page_emitter.page_changed(page, page_count);
        })
    }

    /// Take the document out, leaving an empty payload behind
    ///
    /// Lets a renderer consume the bytes while keeping the callbacks for later.
    pub fn take_source(&mut self) -> DocumentSource {
        std::mem::replace(&mut self.source, DocumentSource::Bytes(Vec::new()))
    }

    /// Invoke `on_load` if one is wired
    pub fn notify_load(&self, page_count: u32) {
        if let Some(f) = &self.on_load {
            f(page_count);
        }
    }

    pub fn notify_error(&self, cause: &dyn std::error::Error) {
        if let Some(f) = &self.on_error {
            f(cause);
        }
    }

    pub fn notify_page_change(&self, page: u32, page_count: u32) {
        if let Some(f) = &self.on_page_change {
            f(page, page_count);
        }
    }
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("source", &self.source)
            .field("default_page", &self.default_page)
            .field("swipe_horizontal", &self.swipe_horizontal)
            .field("spacing", &self.spacing)
            .field("fade_in_duration", &self.fade_in_duration)
            .finish_non_exhaustive()
    }
}

/// One-shot gate for the terminal outcome of a single dispatch
#[derive(Clone, Default)]
pub struct TerminalLatch {
    fired: Arc<AtomicBool>,
}

impl TerminalLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once
    pub fn try_fire(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    /// Suppress any later terminal callback
    pub fn close(&self) {
        self.fired.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Document renderer capability
///
/// `load` only starts the work; completion is reported through the request's
/// callbacks, possibly from another thread.
pub trait Renderer: Send {
    fn load(&mut self, request: LoadRequest) -> std::io::Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn load(&mut self, request: LoadRequest) -> std::io::Result<()> {
        (**self).load(request)
    }
}
