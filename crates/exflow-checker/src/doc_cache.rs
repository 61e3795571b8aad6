//! Lazily loaded sidecar documentation files.

use crate::doc_comments::DocFile;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Sidecar files keyed by path. Missing and unreadable files are cached as
/// `None`, so each path touches the file system at most once per session
/// (modulo a benign race where two threads load the same file).
#[derive(Debug, Default)]
pub struct DocFileCache {
    files: DashMap<PathBuf, Option<Arc<DocFile>>>,
    loads: AtomicUsize,
}

impl DocFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sidecar path of a module: same path, `.xml` extension.
    pub fn sidecar_path(module: &Path) -> PathBuf {
        module.with_extension("xml")
    }

    /// The documentation file next to `module`, if one exists and parses.
    pub fn for_module(&self, module: &Path) -> Option<Arc<DocFile>> {
        let path = Self::sidecar_path(module);
        if let Some(cached) = self.files.get(&path) {
            return cached.clone();
        }
        let loaded = self.load(&path);
        self.files.insert(path, loaded.clone());
        loaded
    }

    fn load(&self, path: &Path) -> Option<Arc<DocFile>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "no documentation file");
                return None;
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "unreadable documentation file");
                return None;
            }
        };
        match DocFile::parse(&text) {
            Ok(file) => {
                debug!(path = %path.display(), members = file.len(), "loaded documentation file");
                Some(Arc::new(file))
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "malformed documentation file");
                None
            }
        }
    }

    /// Number of file-system loads performed so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
