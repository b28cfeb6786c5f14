//! Test doubles for the transport and renderer capabilities

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::descriptor::UrlProps;
use crate::fetch::{FetchError, Transport};
use crate::renderer::{LoadRequest, Renderer};

#[derive(Debug, Clone)]
pub enum TransportBehavior {
    /// Write the bytes and succeed
    Succeed(Vec<u8>),
    /// Fail with an I/O error carrying the message
    Fail(String),
    /// Write a partial body, then never finish
    Hang,
}

/// Transport answering from a routing table
pub struct MockTransport {
    default: TransportBehavior,
    routes: HashMap<String, TransportBehavior>,
    calls: AtomicUsize,
    last_props: Mutex<Option<UrlProps>>,
}

impl MockTransport {
    pub fn new(default: TransportBehavior) -> Self {
        Self {
            default,
            routes: HashMap::new(),
            calls: AtomicUsize::new(0),
            last_props: Mutex::new(None),
        }
    }

    pub fn with_route(mut self, url: &str, behavior: TransportBehavior) -> Self {
        self.routes.insert(url.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_props(&self) -> Option<UrlProps> {
        self.last_props.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn download(
        &self,
        url: &str,
        props: &UrlProps,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_props.lock() = Some(props.clone());

        let behavior = self.routes.get(url).unwrap_or(&self.default).clone();
        match behavior {
            TransportBehavior::Succeed(bytes) => {
                write_existing(destination, &bytes).await?;
                Ok(bytes.len() as u64)
            }
            TransportBehavior::Fail(message) => Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                message,
            ))),
            TransportBehavior::Hang => {
                write_existing(destination, b"%PD").await?;
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

async fn write_existing(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(destination)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}

/// One handoff seen by a [`RecordingRenderer`]
pub struct RecordedLoad {
    pub bytes: Vec<u8>,
    pub request: LoadRequest,
}

#[derive(Default)]
struct RendererLog {
    loads: Vec<RecordedLoad>,
    reject_next: Option<String>,
}

/// Renderer that drains each handoff and keeps its callbacks
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RendererLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_count(&self) -> usize {
        self.log.lock().loads.len()
    }

    pub fn bytes(&self, index: usize) -> Vec<u8> {
        self.log.lock().loads[index].bytes.clone()
    }

    /// `(default_page, swipe_horizontal, spacing, fade_in_duration)` of the last load
    pub fn last_settings(&self) -> (u32, bool, u32, u32) {
        let log = self.log.lock();
        let request = &log.loads.last().expect("no load recorded").request;
        (
            request.default_page,
            request.swipe_horizontal,
            request.spacing,
            request.fade_in_duration,
        )
    }

    pub fn reject_next(&self, message: &str) {
        self.log.lock().reject_next = Some(message.to_string());
    }

    pub fn complete(&self, index: usize, page_count: u32) {
        self.log.lock().loads[index].request.notify_load(page_count);
    }

    pub fn fail(&self, index: usize, message: &str) {
        let cause = std::io::Error::new(std::io::ErrorKind::InvalidData, message.to_string());
        self.log.lock().loads[index].request.notify_error(&cause);
    }

    pub fn change_page(&self, index: usize, page: u32, page_count: u32) {
        self.log.lock().loads[index]
            .request
            .notify_page_change(page, page_count);
    }
}

impl Renderer for RecordingRenderer {
    fn load(&mut self, mut request: LoadRequest) -> std::io::Result<()> {
        let mut log = self.log.lock();
        if let Some(message) = log.reject_next.take() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, message));
        }
        let bytes = request.take_source().into_bytes()?;
        log.loads.push(RecordedLoad { bytes, request });
        Ok(())
    }
}

/// Number of entries in a directory
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
