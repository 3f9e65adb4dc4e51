//! Durable key-value store for whole-collection persistence.
//!
//! The engine reads and writes each logical collection wholesale: load the
//! full document, mutate in memory, persist the full document. This module
//! provides the store seam plus two implementations: a locked, atomically
//! written file store and an in-memory store for deterministic tests.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Logical key for the medication registry collection
pub const MEDICATIONS_KEY: &str = "medications";

/// Logical key for the dose history ledger collection
pub const DOSE_HISTORY_KEY: &str = "dose_history";

/// Store seam for serialized collections.
///
/// One value per logical key; `get` of an absent key is `Ok(None)`, not an
/// error. Implementations serialize concurrent whole-collection writes so
/// the read-modify-write sequences in the engine never interleave.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove_all(&self, keys: &[&str]) -> Result<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// File-backed store: one JSON document per key under a data directory.
///
/// Writes go through a temp file with an exclusive lock, then an atomic
/// rename over the target, so readers never observe a torn document.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            tracing::debug!(%key, "no store file, treating as absent");
            return Ok(None);
        }

        let file = File::open(&path)?;
        // Shared lock so a concurrent writer's rename never races the read
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read_result = reader.read_to_string(&mut contents);
        file.unlock()?;
        read_result?;

        tracing::debug!(%key, bytes = contents.len(), "loaded collection");
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        // Unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(&self.dir)?;

        // Exclusive lock on the temp file serializes concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(self.path_for(key)).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(%key, bytes = value.len(), "persisted collection");
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            let path = self.path_for(key);
            if path.exists() {
                std::fs::remove_file(&path)?;
                tracing::debug!(%key, "removed collection");
            }
        }
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory store behind a single mutex.
///
/// The mutex doubles as the single-writer queue for engine operations that
/// share one store instance.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| Error::Persistence("store mutex poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut values = self.lock()?;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
