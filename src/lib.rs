//! PDF View Loader
//!
//! Resolves a declared document source (remote URL, inline base64 payload,
//! filesystem path or bundled asset) into a readable byte stream, hands it to a
//! renderer, and reports the outcome to the host application as events.
//!
//! # Modules
//!
//! - `loader`: the resolution state machine and its host-facing setters
//! - `lifecycle`: dirty tracking, transient download files, cancellation
//! - `fetch`: cancellable background transfers
//! - `events`: host event protocol
//! - `renderer`: renderer capability and handoff configuration

pub mod assets;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod loader;
pub mod renderer;

#[cfg(test)]
mod testing;

pub use assets::{AssetBundle, DirAssets};
pub use config::{Config, ConfigError, Presentation};
pub use descriptor::{ResourceDescriptor, ResourceKind, UrlProps};
pub use error::{ErrorKind, LoadError, Result};
pub use events::{
    EventEmitter, HostEvent, HostNotifier, MemoryNotifier, RecordedEvent, ViewId, EVENT_ON_ERROR,
    EVENT_ON_LOAD, EVENT_ON_PAGE_CHANGED,
};
pub use fetch::{AsyncFetcher, FetchCompletion, FetchError, FetchHandle, FetchId, HttpTransport, Transport};
pub use lifecycle::{Lifecycle, TransientFile};
pub use loader::{LoadOutcome, LoadState, Loader, RenderStatus};
pub use renderer::{DocumentSource, LoadRequest, Renderer, TerminalLatch};
