//! Transfer transports
//!
//! Defines the transport trait and the HTTP implementation.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Method;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::HttpConfig;
use crate::descriptor::UrlProps;

/// Transfer failure, always carrying its underlying cause
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("cannot write download: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer task aborted: {0}")]
    Task(String),
}

/// Remote transfer capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write the document at `url` into `destination`, returning the byte count
    ///
    /// `destination` already exists; a transport must not recreate it once it
    /// has been removed by the owner.
    async fn download(
        &self,
        url: &str,
        props: &UrlProps,
        destination: &Path,
    ) -> Result<u64, FetchError>;
}

/// HTTP(S) transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn parse_method(props: &UrlProps) -> Result<Method, FetchError> {
    let name = props.method().to_ascii_uppercase();
    Method::from_bytes(name.as_bytes()).map_err(|_| FetchError::InvalidMethod(name))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn download(
        &self,
        url: &str,
        props: &UrlProps,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        let method = parse_method(props)?;

        let mut request = self.client.request(method, url);
        for (name, value) in &props.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &props.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(destination)
            .await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url = %url, bytes = written, "Transfer finished");
        Ok(written)
    }
}
