//! Async Fetcher
//!
//! Cancellable background transfers of remote documents into a destination
//! file.
//!
//! - [`Transport`]: the "fetch bytes at a URL" capability, with an HTTP
//!   implementation backed by `reqwest`
//! - [`AsyncFetcher`]: spawns one transfer per [`FetchHandle`] and reports
//!   its [`FetchCompletion`] back to the owner over a channel
//!
//! Completions are never applied from the transfer task itself. The owner
//! receives them on its own task and applies them there, so loader state is
//! only ever mutated from one context.

mod task;
mod transport;

pub use task::{AsyncFetcher, FetchCompletion, FetchHandle, FetchId};
pub use transport::{FetchError, HttpTransport, Transport};
