//! Persistence backends for layer documents.
//!
//! A [`LayerStorage`] maps [`LayerId`]s to persisted prim trees. The stage
//! never touches files directly, so the serialization backend can be swapped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Context, Result};
use tracing::trace;
use walkdir::WalkDir;

use crate::layer::{LayerId, SpecTree};
use crate::usda::{self, TextReader};

/// Where layers are persisted.
pub trait LayerStorage: Send + Sync {
    /// Whether the backend can currently be read and written.
    fn is_available(&self) -> bool;

    /// Load a persisted layer; `None` if nothing is stored under `id`.
    fn load(&self, id: &LayerId) -> Result<Option<SpecTree>>;

    /// Persist `tree` under `id`, replacing any previous content.
    ///
    /// On failure the previously stored content is left in place.
    fn store(&self, id: &LayerId, tree: &SpecTree) -> Result<()>;

    /// Every identifier with persisted content, sorted.
    fn list(&self) -> Result<Vec<LayerId>>;
}

/// A directory of `.usda` files. `assets/chair.usda` lives at
/// `<root>/assets/chair.usda`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, id: &LayerId) -> PathBuf {
        id.as_str().split('/').fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl LayerStorage for FileStorage {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn load(&self, id: &LayerId) -> Result<Option<SpecTree>> {
        let path = self.file_path(id);
        if !path.is_file() {
            trace!(layer = %id, path = %path.display(), "no persisted layer");
            return Ok(None);
        }

        trace!(layer = %id, path = %path.display(), "load layer");
        let reader = TextReader::read(&path).with_context(|| format!("Failed to load layer '{id}'"))?;
        Ok(Some(reader.into_tree()))
    }

    fn store(&self, id: &LayerId, tree: &SpecTree) -> Result<()> {
        if !self.is_available() {
            bail!("Storage root {} is not a directory", self.root.display());
        }

        let path = self.file_path(id);
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("Layer path {} has no parent directory", path.display()))?;
        fs::create_dir_all(dir).with_context(|| format!("Unable to create directory {}", dir.display()))?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("Layer path {} has no file name", path.display()))?;
        let temp_path = dir.join(format!(".{file_name}.tmp"));

        let text = usda::write_tree(tree);
        fs::write(&temp_path, text.as_bytes())
            .with_context(|| format!("Unable to write {}", temp_path.display()))?;

        if let Err(err) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err).with_context(|| format!("Unable to move layer into place at {}", path.display()));
        }

        trace!(layer = %id, path = %path.display(), bytes = text.len(), "stored layer");
        Ok(())
    }

    fn list(&self) -> Result<Vec<LayerId>> {
        if !self.is_available() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.with_context(|| format!("Unable to walk {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_usda = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("usda"));
            let is_hidden = entry.file_name().to_str().is_some_and(|name| name.starts_with('.'));
            if !is_usda || is_hidden {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
            match parts.map(|parts| LayerId::new(parts.join("/"))) {
                Some(Ok(id)) => ids.push(id),
                _ => trace!(path = %path.display(), "skip file without a valid layer id"),
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// In-process storage. Layers are kept as `.usda` text so they go through the
/// same serialization as [`FileStorage`].
#[derive(Debug)]
pub struct MemoryStorage {
    documents: RwLock<BTreeMap<LayerId, String>>,
    available: AtomicBool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Make the storage refuse every store while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The stored text for `id`.
    pub fn text(&self, id: &LayerId) -> Option<String> {
        self.documents.read().ok()?.get(id).cloned()
    }
}

impl LayerStorage for MemoryStorage {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn load(&self, id: &LayerId) -> Result<Option<SpecTree>> {
        let Some(text) = self.text(id) else {
            return Ok(None);
        };
        let reader = TextReader::parse(&text).with_context(|| format!("Failed to load layer '{id}'"))?;
        Ok(Some(reader.into_tree()))
    }

    fn store(&self, id: &LayerId, tree: &SpecTree) -> Result<()> {
        if !self.is_available() {
            bail!("Memory storage is unavailable");
        }
        let text = usda::write_tree(tree);
        self.documents
            .write()
            .map_err(|_| anyhow!("Memory storage lock is poisoned"))?
            .insert(id.clone(), text);
        Ok(())
    }

    fn list(&self) -> Result<Vec<LayerId>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| anyhow!("Memory storage lock is poisoned"))?;
        Ok(documents.keys().cloned().collect())
    }
}
