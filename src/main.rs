//! PDF View Loader probe
//!
//! Resolves one document source the way an embedded view would and prints the
//! host events it produces as JSON lines.
//!
//! ```text
//! pdfview-loader <url|base64|file> <source>
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pdfview_loader::{
    Config, HostNotifier, HttpTransport, LoadRequest, Loader, RenderStatus, Renderer, ViewId,
    EVENT_ON_ERROR,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Writes each host event to stdout
#[derive(Default)]
struct StdoutNotifier {
    saw_error: AtomicBool,
}

impl HostNotifier for StdoutNotifier {
    fn notify(&self, view_id: ViewId, event_name: &str, payload: Value) {
        if event_name == EVENT_ON_ERROR {
            self.saw_error.store(true, Ordering::SeqCst);
        }
        println!(
            "{}",
            json!({ "view": view_id, "event": event_name, "payload": payload })
        );
    }
}

/// Renderer stand-in that only checks the document signature
#[derive(Default)]
struct ProbeRenderer {
    pending: Vec<JoinHandle<()>>,
}

impl ProbeRenderer {
    async fn finish(&mut self) {
        for task in self.pending.drain(..) {
            let _ = task.await;
        }
    }
}

/// Rough count of page objects, good enough for a probe
fn estimate_page_count(bytes: &[u8]) -> u32 {
    let marker = b"/Type /Page";
    bytes
        .windows(marker.len() + 1)
        .filter(|w| w.starts_with(marker) && w[marker.len()] != b's')
        .count() as u32
}

impl Renderer for ProbeRenderer {
    fn load(&mut self, mut request: LoadRequest) -> std::io::Result<()> {
        let bytes = request.take_source().into_bytes()?;
        tracing::info!(bytes = bytes.len(), spacing = request.spacing, "Probe received document");

        self.pending.push(tokio::spawn(async move {
            if bytes.starts_with(PDF_SIGNATURE) {
                let pages = estimate_page_count(&bytes);
                request.notify_load(pages);
                if pages > 0 {
                    request.notify_page_change(request.default_page, pages);
                }
            } else {
                let cause = std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "document does not start with %PDF-",
                );
                request.notify_error(&cause);
            }
        }));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfview_loader=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let mut args = std::env::args().skip(1);
    let (kind, source) = match (args.next(), args.next()) {
        (Some(kind), Some(source)) => (kind, source),
        _ => {
            eprintln!("usage: pdfview-loader <url|base64|file> <source>");
            std::process::exit(2);
        }
    };

    tracing::info!("Starting pdfview-loader v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Cache dir: {}", config.storage.cache_dir.display());

    let notifier = Arc::new(StdoutNotifier::default());
    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let mut loader = Loader::new(
        1,
        &config,
        ProbeRenderer::default(),
        notifier.clone(),
        transport,
    );

    loader.set_source(Some(source));
    loader.set_resource_type(Some(kind));

    let outcome = match loader.render() {
        RenderStatus::Pending(fetch_id) => {
            tracing::info!(fetch_id, "Waiting for download");
            loader.wait_for_fetch().await
        }
        RenderStatus::Finished(outcome) => Some(outcome),
        RenderStatus::Unchanged => None,
    };

    if let Some(outcome) = &outcome {
        tracing::debug!(success = outcome.is_success(), "Pipeline finished");
    }

    loader.renderer_mut().finish().await;
    loader.teardown();

    if notifier.saw_error.load(Ordering::SeqCst) {
        std::process::exit(1);
    }
    Ok(())
}
