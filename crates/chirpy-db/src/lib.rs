pub mod error;
pub mod models;
pub mod queries;

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

pub use error::{Result, StoreError};
pub use models::{ChirpRow, Document, UserRow, UserUpdate};

/// Single-file JSON store.
///
/// Every operation holds `lock` for its whole duration: shared for reads
/// (load + read), exclusive for writes (load + mutate + write). The file is
/// read and rewritten in full each time; there is no in-memory cache.
pub struct Store {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Store {
    /// Open the store at `path`, creating an empty document if the file is missing.
    /// An existing file is left untouched.
    pub fn open(path: &Path) -> Result<Self> {
        if ensure(path)? {
            info!("Created empty database at {}", path.display());
        } else {
            info!("Database opened at {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current on-disk document.
    pub fn snapshot(&self) -> Result<Document> {
        self.with_doc(|doc| Ok(doc.clone()))
    }

    pub(crate) fn with_doc<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Document) -> Result<T>,
    {
        let _guard = self.shared()?;
        let doc = self.load()?;
        f(&doc)
    }

    /// Load, mutate and persist under the exclusive lock. Nothing is written
    /// when `f` fails.
    pub(crate) fn with_doc_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.exclusive()?;
        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        self.persist(&doc)?;
        Ok(out)
    }

    pub(crate) fn shared(&self) -> Result<RwLockReadGuard<'_, ()>> {
        self.lock.read().map_err(|_| StoreError::Poisoned)
    }

    pub(crate) fn exclusive(&self) -> Result<RwLockWriteGuard<'_, ()>> {
        self.lock.write().map_err(|_| StoreError::Poisoned)
    }

    /// Callers must hold the lock.
    pub(crate) fn load(&self) -> Result<Document> {
        let data = fs::read(&self.path)?;
        let doc = serde_json::from_slice(&data)?;
        Ok(doc)
    }

    /// Callers must hold the exclusive lock.
    pub(crate) fn persist(&self, doc: &Document) -> Result<()> {
        write_document(&self.path, doc)?;
        debug!(
            users = doc.users.len(),
            chirps = doc.chirps.len(),
            "Database written"
        );
        Ok(())
    }
}

/// Create `path` holding an empty document when it does not exist yet.
/// Returns whether the file was created.
fn ensure(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            write_document(path, &Document::default())?;
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Serialize to `<file>.tmp`, fsync, then rename over `path` so readers never
/// observe a torn document.
fn write_document(path: &Path, doc: &Document) -> Result<()> {
    let data = serde_json::to_vec(doc)?;
    let tmp = tmp_path(path);

    {
        let mut file = open_for_write(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

fn open_for_write(path: &Path) -> io::Result<fs::File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }

    opts.open(path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("database.json"));
    name.push(".tmp");
    path.with_file_name(name)
}
