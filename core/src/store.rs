//! Key-value blob stores backing persisted state.
//!
//! A store holds named slots, each a single text blob. The registry and the
//! virtual authenticator each own one slot and always replace it wholesale.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use tracing::debug;

/// Slot-addressed blob storage.
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when the slot has never been written.
    fn read(&self, slot: &str) -> io::Result<Option<String>>;
    fn write(&self, slot: &str, blob: &str) -> io::Result<()>;
}

/// In-process store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a slot, e.g. with a blob written by an older harness.
    #[must_use]
    pub fn with_slot(self, slot: impl Into<String>, blob: impl Into<String>) -> Self {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot.into(), blob.into());
        self
    }

    /// Current raw contents of a slot.
    #[must_use]
    pub fn snapshot(&self, slot: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slot)
            .cloned()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, slot: &str) -> io::Result<Option<String>> {
        Ok(self.snapshot(slot))
    }

    fn write(&self, slot: &str, blob: &str) -> io::Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot.to_string(), blob.to_string());
        Ok(())
    }
}

/// One JSON file per slot under a directory.
///
/// Writes go to a temp file in the same directory and are renamed over the
/// slot file, so a reader sees either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Slot names map to file names; anything outside `[A-Za-z0-9_-]` becomes `_`.
    #[must_use]
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        let file_stem: String = slot
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_stem}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, slot: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, slot: &str, blob: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(slot);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(blob.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| err.error)?;

        debug!(path = %path.display(), bytes = blob.len(), "Slot written");
        Ok(())
    }
}
