//! Resource descriptor types
//!
//! The host declares a document as a source string, a resource type naming how
//! to interpret it, and optional transport properties used for remote sources.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Strategy selector for a declared source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Remote document fetched into a transient file
    Url,
    /// Inline base64 payload
    Base64,
    /// Absolute filesystem path or bundled asset name
    File,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Url => "url",
            ResourceKind::Base64 => "base64",
            ResourceKind::File => "file",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(ResourceKind::Url),
            "base64" => Ok(ResourceKind::Base64),
            "file" => Ok(ResourceKind::File),
            other => Err(LoadError::InvalidResourceType(other.to_string())),
        }
    }
}

/// Extended properties for `url` sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlProps {
    /// HTTP method, `GET` when absent
    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Sent verbatim, no additional encoding applied
    #[serde(default)]
    pub body: Option<String>,
}

impl UrlProps {
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }
}

/// Declared document source
///
/// The resource type is held as the raw host string so that an unrecognized
/// value can be reported verbatim when the loader dispatches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub source: Option<String>,
    pub resource_type: Option<String>,
    pub url_props: Option<UrlProps>,
}

impl ResourceDescriptor {
    pub fn new(source: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            source: Some(source.into()),
            resource_type: Some(kind.as_str().to_string()),
            url_props: None,
        }
    }

    pub fn with_url_props(mut self, props: UrlProps) -> Self {
        self.url_props = Some(props);
        self
    }
}
