// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file implementation of the key-value port.
//!
//! All keys live in one JSON object file. Writes are atomic (write to
//! `.tmp`, fsync, rename) so a crash mid-save never corrupts the file. A
//! corrupt file found at load time is rotated to a `.bak` file and treated
//! as empty; client state is small and recoverable from the backend.

use crate::kv::KvStore;
use crate::state::StoreError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

const MAX_BAK_FILES: u32 = 3;

/// File-backed store. Clones share the same file and cache.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    cache: Arc<Mutex<BTreeMap<String, String>>>,
}

impl FileStore {
    /// Open (or create) the store at `path`, loading existing state.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cache = load_map(&path)?;
        Ok(Self {
            path,
            cache: Arc::new(Mutex::new(cache)),
        })
    }

    /// Open the store at the default location under the user state dir.
    pub fn open_default() -> Result<Self, StoreError> {
        let base = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::open(base.join("usher").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the full map atomically: `.tmp`, fsync, rename.
    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, map)?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.cache.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.cache.lock();
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.cache.lock();
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

/// Load the map, rotating a corrupt file out of the way.
fn load_map(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(map) => Ok(map),
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "Corrupt state file, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(BTreeMap::new())
        }
    }
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    // Remove the oldest if at capacity
    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    // Shift existing backups up by one
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
