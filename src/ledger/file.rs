//! JSON-file ledger
//!
//! The whole ledger lives in one JSON object keyed by ledger key. Every
//! mutation rewrites it through a temp file and a rename, so a crash leaves
//! either the previous or the new file on disk.
//!
//! # Concurrency
//!
//! Several handles (in this process or in others, e.g. `serve` next to a
//! manual `namespace set`) may share one file. Each mutation holds an
//! exclusive `flock` on `<ledger>.json.lock`, re-reads the file, applies its
//! change and renames the result into place before the lock is dropped.
//! Reads go to disk and never observe a partial file because of the rename.

use crate::error::{PinkeepError, PinkeepResult, StorageOp};
use crate::ledger::entry::LedgerEntry;
use crate::ledger::store::LedgerStore;
use async_trait::async_trait;
use fs2::FileExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, LedgerEntry>;

/// Ledger persisted to a single JSON file
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    lock_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    /// Open the ledger at `path`, starting empty if the file does not exist
    ///
    /// An existing file is validated up front so a corrupt ledger is reported
    /// before any work starts.
    pub async fn open(path: impl Into<PathBuf>) -> PinkeepResult<Self> {
        let path = path.into();
        let entries = Self::load(&path).await?;
        debug!("Opened ledger {} ({} entries)", path.display(), entries.len());

        Ok(Self {
            lock_path: path.with_extension("json.lock"),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> PinkeepResult<Entries> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Ledger {} not found, starting empty", path.display());
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                return Err(PinkeepError::io(
                    format!("reading ledger {}", path.display()),
                    e,
                ))
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| PinkeepError::LedgerCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Block until this handle holds the cross-process write lock
    ///
    /// The lock is released when the returned file is dropped.
    async fn acquire_file_lock(&self) -> std::io::Result<std::fs::File> {
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)?
    }

    /// Apply `change` to the on-disk ledger under the write lock
    ///
    /// `change` returns false when it left the entries untouched, in which
    /// case nothing is written.
    async fn modify<F>(&self, op: StorageOp, key: &str, change: F) -> PinkeepResult<()>
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let _local = self.write_lock.lock().await;
        let _file_lock = self
            .acquire_file_lock()
            .await
            .map_err(|e| PinkeepError::storage(op, key, e))?;

        let mut entries = Self::load(&self.path)
            .await
            .map_err(|e| PinkeepError::storage(op, key, e))?;
        if !change(&mut entries) {
            return Ok(());
        }

        self.persist(&entries)
            .await
            .map_err(|e| PinkeepError::storage(op, key, e))
    }

    async fn persist(&self, entries: &Entries) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await
    }
}

#[async_trait]
impl LedgerStore for FileLedger {
    async fn get(&self, key: &str) -> PinkeepResult<Option<LedgerEntry>> {
        let mut entries = Self::load(&self.path)
            .await
            .map_err(|e| PinkeepError::storage(StorageOp::Get, key, e))?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, entry: LedgerEntry) -> PinkeepResult<()> {
        self.modify(StorageOp::Set, key, |entries| {
            entries.insert(key.to_string(), entry);
            true
        })
        .await
    }

    async fn delete(&self, key: &str) -> PinkeepResult<()> {
        self.modify(StorageOp::Delete, key, |entries| {
            entries.remove(key).is_some()
        })
        .await
    }

    async fn keys(&self) -> PinkeepResult<Vec<String>> {
        let entries = Self::load(&self.path)
            .await
            .map_err(|e| PinkeepError::storage(StorageOp::Keys, "*", e))?;
        Ok(entries.into_keys().collect())
    }
}
