//! Source resolution and loading pipeline
//!
//! The [`Loader`] turns the declared descriptor into a document handed to the
//! renderer:
//!
//! ```text
//! Idle ─render()─▶ Resolving ─┬─ file / base64 ──────────────▶ Handoff ─┬─▶ Loaded
//!                             └─ url ─▶ Downloading ─▶ Ready ─▶ Handoff ─┴─▶ Failed
//! ```
//!
//! Only the `url` branch suspends. Its completion is delivered to the loader's
//! owner through [`Loader::wait_for_fetch`] or [`Loader::poll_completions`], so
//! every state change happens on the task that calls `render()`.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut loader = Loader::new(1, &config, renderer, notifier, transport);
//! loader.set_source(Some("https://example.com/doc.pdf".into()));
//! loader.set_resource_type(Some("url".into()));
//!
//! if let RenderStatus::Pending(_) = loader.render() {
//!     let outcome = loader.wait_for_fetch().await;
//! }
//! loader.teardown();
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tokio::sync::mpsc;

use crate::assets::{AssetBundle, DirAssets};
use crate::config::{Config, Presentation};
use crate::descriptor::{ResourceDescriptor, ResourceKind, UrlProps};
use crate::error::{ErrorKind, LoadError, Result};
use crate::events::{EventEmitter, HostNotifier, ViewId};
use crate::fetch::{AsyncFetcher, FetchCompletion, FetchId, Transport};
use crate::lifecycle::{Lifecycle, TransientFile};
use crate::renderer::{DocumentSource, LoadRequest, Renderer, TerminalLatch};

/// Standard alphabet; line breaks are stripped beforehand and padding is optional
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Resolving,
    Downloading { fetch_id: FetchId },
    Ready,
    Handoff,
    Loaded,
    Failed(ErrorKind),
}

/// Terminal result of one dispatch
#[derive(Debug)]
pub enum LoadOutcome {
    /// The document was handed to the renderer
    Success,
    Failure(LoadError),
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Success)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadOutcome::Success => None,
            LoadOutcome::Failure(e) => Some(e),
        }
    }
}

/// What a call to [`Loader::render`] did
#[derive(Debug)]
pub enum RenderStatus {
    /// Descriptor unchanged since the last dispatch; nothing happened
    Unchanged,
    /// A remote transfer was started; its outcome arrives later
    Pending(FetchId),
    Finished(LoadOutcome),
}

impl RenderStatus {
    pub fn outcome(&self) -> Option<&LoadOutcome> {
        match self {
            RenderStatus::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Document loader for one view
pub struct Loader<R: Renderer> {
    lifecycle: Lifecycle,
    state: LoadState,
    renderer: R,
    emitter: EventEmitter,
    fetcher: AsyncFetcher,
    completions: mpsc::UnboundedReceiver<FetchCompletion>,
    assets: Arc<dyn AssetBundle>,
    cache_dir: PathBuf,
    presentation: Presentation,
    fade_in_duration: u32,
    /// Gate for the renderer callbacks of the latest handoff
    latch: Option<TerminalLatch>,
}

impl<R: Renderer> Loader<R> {
    pub fn new(
        view_id: ViewId,
        config: &Config,
        renderer: R,
        notifier: Arc<dyn HostNotifier>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (fetcher, completions) = AsyncFetcher::new(transport);
        Self {
            lifecycle: Lifecycle::new(),
            state: LoadState::Idle,
            renderer,
            emitter: EventEmitter::new(view_id, notifier),
            fetcher,
            completions,
            assets: Arc::new(DirAssets::new(config.storage.asset_dir.clone())),
            cache_dir: config.storage.cache_dir.clone(),
            presentation: config.presentation,
            fade_in_duration: 0,
            latch: None,
        }
    }

    /// Replace the bundled-asset namespace used for relative `file` sources
    pub fn with_assets(mut self, assets: Arc<dyn AssetBundle>) -> Self {
        self.assets = assets;
        self
    }

    // ========================================================================
    // Host setters
    // ========================================================================

    pub fn set_source(&mut self, source: Option<String>) {
        self.lifecycle.set_source(source);
    }

    pub fn set_resource_type(&mut self, resource_type: Option<String>) {
        self.lifecycle.set_resource_type(resource_type);
    }

    pub fn set_resource_kind(&mut self, kind: Option<ResourceKind>) {
        self.lifecycle
            .set_resource_type(kind.map(|k| k.as_str().to_string()));
    }

    pub fn set_url_props(&mut self, props: Option<UrlProps>) {
        self.lifecycle.set_url_props(props);
    }

    /// Apply all descriptor fields at once
    pub fn set_descriptor(&mut self, descriptor: ResourceDescriptor) {
        self.lifecycle.set_source(descriptor.source);
        self.lifecycle.set_resource_type(descriptor.resource_type);
        self.lifecycle.set_url_props(descriptor.url_props);
    }

    /// Passed through to the renderer on the next handoff
    pub fn set_fade_in_duration(&mut self, millis: u32) {
        self.fade_in_duration = millis;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn view_id(&self) -> ViewId {
        self.emitter.view_id()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Load the declared document if it changed since the last dispatch
    ///
    /// Must be called from within a tokio runtime when the source is a URL.
    pub fn render(&mut self) -> RenderStatus {
        let descriptor = self.lifecycle.descriptor();
        let (source, resource_type) = (descriptor.source.clone(), descriptor.resource_type.clone());

        // An incomplete descriptor still drops whatever the previous one started.
        let Some(source) = source else {
            self.release();
            return RenderStatus::Finished(self.conclude(Err(LoadError::NoResource)));
        };
        let Some(resource_type) = resource_type else {
            self.release();
            return RenderStatus::Finished(self.conclude(Err(LoadError::NoResourceType)));
        };

        if !self.lifecycle.is_dirty() || self.lifecycle.is_fetching_current() {
            tracing::debug!(view_id = self.view_id(), "Descriptor unchanged, skipping render");
            return RenderStatus::Unchanged;
        }

        self.release();
        self.state = LoadState::Resolving;

        let kind = match resource_type.parse::<ResourceKind>() {
            Ok(kind) => kind,
            Err(e) => return RenderStatus::Finished(self.conclude(Err(e))),
        };

        tracing::info!(view_id = self.view_id(), kind = %kind, "Dispatching load");
        let revision = self.lifecycle.revision();

        match kind {
            ResourceKind::File => {
                let result = self
                    .open_file(&source)
                    .and_then(|document| self.handoff(document, revision));
                RenderStatus::Finished(self.conclude(result))
            }
            ResourceKind::Base64 => {
                let result = decode_base64(&source)
                    .and_then(|bytes| self.handoff(DocumentSource::Bytes(bytes), revision));
                RenderStatus::Finished(self.conclude(result))
            }
            ResourceKind::Url => self.start_download(&source),
        }
    }

    /// Await the in-flight transfer and apply its outcome
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn wait_for_fetch(&mut self) -> Option<LoadOutcome> {
        while self.lifecycle.has_in_flight() {
            let completion = self.completions.recv().await?;
            if let Some(outcome) = self.handle_completion(completion) {
                return Some(outcome);
            }
        }
        None
    }

    /// Apply any transfer completion that is already available
    pub fn poll_completions(&mut self) -> Option<LoadOutcome> {
        while let Ok(completion) = self.completions.try_recv() {
            if let Some(outcome) = self.handle_completion(completion) {
                return Some(outcome);
            }
        }
        None
    }

    /// Apply one transfer completion
    ///
    /// Completions of cancelled transfers are dropped and yield `None`.
    pub fn handle_completion(&mut self, completion: FetchCompletion) -> Option<LoadOutcome> {
        let Some(revision) = self.lifecycle.finish_fetch(completion.id) else {
            tracing::debug!(
                view_id = self.view_id(),
                fetch_id = completion.id,
                "Ignoring completion of cancelled transfer"
            );
            return None;
        };

        let result = match completion.result {
            Ok(bytes) => {
                tracing::info!(
                    view_id = self.view_id(),
                    fetch_id = completion.id,
                    bytes,
                    "Download complete"
                );
                self.state = LoadState::Ready;
                self.open_download()
                    .and_then(|document| self.handoff(document, revision))
            }
            Err(e) => Err(LoadError::Fetch(e)),
        };

        if result.is_err() {
            self.discard_download();
        }
        Some(self.conclude(result))
    }

    /// Cancel outstanding work, delete the download and force the next render
    ///
    /// Safe to call at any time, including when nothing is loaded.
    pub fn teardown(&mut self) {
        if let Some(latch) = self.latch.take() {
            latch.close();
        }
        if let Err(e) = self.lifecycle.teardown() {
            self.emitter.error(e.host_message());
        }
        self.state = LoadState::Idle;
        tracing::debug!(view_id = self.view_id(), "Loader torn down");
    }

    // ========================================================================
    // Strategies
    // ========================================================================

    fn open_file(&self, source: &str) -> Result<DocumentSource> {
        let opened: std::io::Result<Box<dyn Read + Send>> = if Path::new(source).has_root() {
            File::open(source).map(|f| Box::new(f) as Box<dyn Read + Send>)
        } else {
            self.assets.open(source)
        };

        opened
            .map(DocumentSource::Stream)
            .map_err(|e| LoadError::Open {
                path: source.to_string(),
                source: e,
            })
    }

    fn start_download(&mut self, url: &str) -> RenderStatus {
        let file = match TransientFile::create_in(&self.cache_dir) {
            Ok(file) => file,
            Err(e) => return RenderStatus::Finished(self.conclude(Err(LoadError::TempFile(e)))),
        };

        let props = self
            .lifecycle
            .descriptor()
            .url_props
            .clone()
            .unwrap_or_default();
        let handle = self.fetcher.start(url, file.path().to_path_buf(), props);
        let fetch_id = handle.id();

        tracing::debug!(
            view_id = self.view_id(),
            fetch_id,
            path = %file.path().display(),
            "Downloading into transient file"
        );

        self.lifecycle.begin_fetch(file, handle);
        self.state = LoadState::Downloading { fetch_id };
        RenderStatus::Pending(fetch_id)
    }

    fn open_download(&self) -> Result<DocumentSource> {
        self.lifecycle
            .open_transient()
            .map(|file| DocumentSource::Stream(Box::new(file)))
            .map_err(|e| LoadError::Open {
                path: self
                    .lifecycle
                    .transient_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                source: e,
            })
    }

    fn handoff(&mut self, document: DocumentSource, revision: u64) -> Result<()> {
        self.state = LoadState::Handoff;

        let latch = TerminalLatch::new();
        let request = LoadRequest::from_source(document)
            .presentation(self.presentation)
            .fade_in_duration(self.fade_in_duration)
            .forward_to(&self.emitter, latch.clone());

        self.renderer.load(request).map_err(LoadError::Handoff)?;

        self.latch = Some(latch);
        self.lifecycle.mark_dispatched(revision);
        Ok(())
    }

    // ========================================================================
    // Cleanup and outcomes
    // ========================================================================

    /// Full cleanup ahead of a new dispatch
    fn release(&mut self) {
        if let Some(latch) = self.latch.take() {
            latch.close();
        }
        // Deletion failures are reported and the new load proceeds.
        if let Err(e) = self.lifecycle.cleanup() {
            self.emitter.error(e.host_message());
        }
    }

    fn discard_download(&mut self) {
        if let Err(e) = self.lifecycle.discard_transient() {
            self.emitter.error(e.host_message());
        }
    }

    fn conclude(&mut self, result: Result<()>) -> LoadOutcome {
        match result {
            Ok(()) => {
                self.state = LoadState::Loaded;
                tracing::debug!(view_id = self.view_id(), "Document handed to renderer");
                LoadOutcome::Success
            }
            Err(e) => {
                self.state = LoadState::Failed(e.kind());
                tracing::error!(
                    view_id = self.view_id(),
                    kind = %e.kind(),
                    error = %e,
                    "Load failed"
                );
                self.emitter.error(e.host_message());
                LoadOutcome::Failure(e)
            }
        }
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(compact).map_err(LoadError::InvalidEncoding)
}
