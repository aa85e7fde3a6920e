//! Filesystem source resolver
//!
//! Tokens are file paths, optionally relative to a root folder. The access
//! grant is the open file handle itself, so a moved or unreadable file fails
//! at resolve time rather than at first decode.

use super::{AccessGrant, ResolvedSource, SourceResolver, SourceToken};
use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves path tokens to open files
#[derive(Debug, Clone, Default)]
pub struct FsSourceResolver {
    root_folder: Option<PathBuf>,
}

impl FsSourceResolver {
    pub fn new() -> Self {
        Self { root_folder: None }
    }

    /// Resolve relative tokens against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: Some(root.into()),
        }
    }

    fn locate(&self, token: &SourceToken) -> PathBuf {
        let path = Path::new(token.as_str());
        match &self.root_folder {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Open file handle held for the lifetime of a session
#[derive(Debug)]
struct FileGrant {
    path: PathBuf,
    _file: File,
}

impl AccessGrant for FileGrant {}

impl Drop for FileGrant {
    fn drop(&mut self) {
        debug!("Released file access: {}", self.path.display());
    }
}

impl SourceResolver for FsSourceResolver {
    fn resolve(&self, token: &SourceToken) -> Result<ResolvedSource> {
        let path = self.locate(token);

        let access_error = |reason: String| Error::ResourceAccess {
            token: token.to_string(),
            reason,
        };

        let metadata = std::fs::metadata(&path).map_err(|e| access_error(e.to_string()))?;
        if !metadata.is_file() {
            return Err(access_error(format!("{} is not a regular file", path.display())));
        }

        let file = File::open(&path).map_err(|e| access_error(e.to_string()))?;
        let locator = path.canonicalize().unwrap_or_else(|_| path.clone());

        debug!("Opened file access: {}", locator.display());
        Ok(ResolvedSource::new(
            token.clone(),
            locator.clone(),
            Box::new(FileGrant {
                path: locator,
                _file: file,
            }),
        ))
    }
}
