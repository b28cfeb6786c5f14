//! Bundled asset namespace
//!
//! `file` sources that are not absolute paths name an asset shipped with the
//! application. Hosts plug in their own bundle; [`DirAssets`] serves a plain
//! directory.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Capability for opening a bundled asset by name
pub trait AssetBundle: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Assets served from a directory on disk
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an asset name to a path below the root
    ///
    /// Names that would escape the root (`..`, absolute components) are rejected.
    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid asset name: {}", name),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetBundle for DirAssets {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let path = self.resolve(name)?;
        let file = File::open(&path)?;
        Ok(Box::new(file))
    }
}
