//! Read-at access to the local file being uploaded.

use anyhow::{Context, Result};
use std::fs::File;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reader for the source file. Safe to clone and use from multiple transfer
/// slots; each `read_at` is independent (pread-style).
#[derive(Clone)]
pub struct ChunkSource {
    file: Arc<File>,
    path: PathBuf,
    len: u64,
}

impl ChunkSource {
    /// Open the file and capture its length for part planning.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open source file: {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat source file: {}", path.display()))?
            .len();
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
            len,
        })
    }

    /// Total file size in bytes, as observed at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent to the remote service when creating the session.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string())
    }

    /// Read into `buf` starting at `offset`. Returns bytes read (0 at EOF).
    /// Does not change the file's logical cursor; safe for concurrent use.
    #[cfg(unix)]
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read_at(buf, offset)
    }

    /// Stub for non-Unix (e.g. Windows): use seek + read on a cloned handle.
    #[cfg(not(unix))]
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.read(buf)
    }
}
