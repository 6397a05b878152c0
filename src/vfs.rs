//! Virtual filesystem adapter.
//!
//! Presents the POSIX-like surface the embedded version-control engine
//! expects (open/read/write/readdir/stat/unlink) on top of a
//! [`StorageBackend`], which only knows whole-object reads and writes.
//! Positional and append writes are therefore read-modify-write: the
//! existing object is fetched, spliced at the requested offset, and
//! rewritten in full.
//!
//! Descriptors are numbered from 3 and track a cursor per open file.
//! Symlinks are unsupported; any attempt to create or read one fails.

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::paths;
use crate::store::StorageBackend;

/// Parsed open(2)-style mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenFlags {
    /// Parse an fopen-style mode string: `r`, `r+`, `w`, `w+`, `a`, `a+`.
    pub fn parse(mode: &str) -> Result<Self> {
        let flags = match mode {
            "r" => Self { read: true, write: false, create: false, truncate: false, append: false },
            "r+" => Self { read: true, write: true, create: false, truncate: false, append: false },
            "w" => Self { read: false, write: true, create: true, truncate: true, append: false },
            "w+" => Self { read: true, write: true, create: true, truncate: true, append: false },
            "a" => Self { read: false, write: true, create: true, truncate: false, append: true },
            "a+" => Self { read: true, write: true, create: true, truncate: false, append: true },
            other => return Err(anyhow!("Unsupported open mode '{other}'")),
        };
        Ok(flags)
    }

    fn write_capable(&self) -> bool {
        self.write
    }
}

/// Kind of node a [`Stat`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Minimal metadata record synthesized from a binary-read-or-directory
/// probe. The backends expose no timestamps, so the fields are fixed at
/// zero and callers treat them as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub kind: NodeKind,
    pub size: u64,
    pub mtime_ms: i64,
    pub ctime_ms: i64,
}

impl Stat {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        false
    }
}

struct OpenFile {
    path: String,
    flags: OpenFlags,
    cursor: u64,
}

#[derive(Default)]
struct DescriptorTable {
    next_fd: u64,
    open: HashMap<u64, OpenFile>,
}

/// POSIX-like filesystem surface over a storage backend.
pub struct Vfs {
    backend: Arc<dyn StorageBackend>,
    descriptors: Mutex<DescriptorTable>,
}

impl Vfs {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            descriptors: Mutex::new(DescriptorTable {
                // 0-2 stay reserved for the conventional stdio descriptors
                next_fd: 3,
                open: HashMap::new(),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Open a path, allocating a numeric descriptor (>= 3). Write-capable
    /// modes eagerly create missing parent directories.
    pub fn open(&self, path: &str, mode: &str) -> Result<u64> {
        let path = paths::normalize(path);
        let flags = OpenFlags::parse(mode)?;

        let existing = self.backend.read_binary(&path)?;
        // Non-creating modes ("r", "r+") require the target to exist.
        if existing.is_none() && !flags.create {
            return Err(paths::not_found(&path).into());
        }
        if flags.write_capable() {
            if let Some((parent, _)) = path.rsplit_once('/') {
                self.backend.create_dir(parent)?;
            }
            if flags.truncate || (flags.create && existing.is_none()) {
                self.backend.write_binary(&path, &[])?;
            }
        }

        let mut table = self.descriptors.lock();
        let fd = table.next_fd;
        table.next_fd += 1;
        table.open.insert(
            fd,
            OpenFile {
                path,
                flags,
                cursor: 0,
            },
        );
        Ok(fd)
    }

    pub fn close(&self, fd: u64) -> Result<()> {
        self.descriptors
            .lock()
            .open
            .remove(&fd)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Bad file descriptor: {fd}"))
    }

    /// Read into `buf` from the descriptor's cursor (or `offset` when
    /// given, which leaves the cursor untouched). Returns bytes read.
    pub fn read(&self, fd: u64, buf: &mut [u8], offset: Option<u64>) -> Result<usize> {
        let (path, cursor) = {
            let table = self.descriptors.lock();
            let file = table
                .open
                .get(&fd)
                .ok_or_else(|| anyhow!("Bad file descriptor: {fd}"))?;
            if !file.flags.read {
                return Err(anyhow!("Descriptor {fd} is not open for reading"));
            }
            (file.path.clone(), file.cursor)
        };

        let content = self
            .backend
            .read_binary(&path)?
            .ok_or_else(|| anyhow::Error::new(paths::not_found(&path)))?;

        let pos = offset.unwrap_or(cursor) as usize;
        if pos >= content.len() {
            return Ok(0);
        }
        let n = buf.len().min(content.len() - pos);
        buf[..n].copy_from_slice(&content[pos..pos + n]);

        if offset.is_none() {
            let mut table = self.descriptors.lock();
            if let Some(file) = table.open.get_mut(&fd) {
                file.cursor = (pos + n) as u64;
            }
        }
        Ok(n)
    }

    /// Write `data` at the descriptor's cursor, at `offset`, or at
    /// end-of-file for append mode. The backend has no partial-write
    /// primitive, so the object is spliced in memory and rewritten whole.
    pub fn write(&self, fd: u64, data: &[u8], offset: Option<u64>) -> Result<usize> {
        let (path, cursor, append) = {
            let table = self.descriptors.lock();
            let file = table
                .open
                .get(&fd)
                .ok_or_else(|| anyhow!("Bad file descriptor: {fd}"))?;
            if !file.flags.write {
                return Err(anyhow!("Descriptor {fd} is not open for writing"));
            }
            (file.path.clone(), file.cursor, file.flags.append)
        };

        let mut content = self.backend.read_binary(&path)?.unwrap_or_default();
        let pos = if append {
            content.len()
        } else {
            offset.unwrap_or(cursor) as usize
        };

        if pos > content.len() {
            content.resize(pos, 0);
        }
        let end = pos + data.len();
        if end <= content.len() {
            content[pos..end].copy_from_slice(data);
        } else {
            content.truncate(pos);
            content.extend_from_slice(data);
        }
        self.backend.write_binary(&path, &content)?;

        if offset.is_none() {
            let mut table = self.descriptors.lock();
            if let Some(file) = table.open.get_mut(&fd) {
                file.cursor = end as u64;
            }
        }
        Ok(data.len())
    }

    /// Read a whole file as raw bytes. Absent paths fail with the
    /// recognizable not-found error.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let path = paths::normalize(path);
        self.backend
            .read_binary(&path)?
            .ok_or_else(|| anyhow::Error::new(paths::not_found(&path)))
    }

    /// Read a whole file decoded as UTF-8.
    pub fn read_file_utf8(&self, path: &str) -> Result<String> {
        let path = paths::normalize(path);
        let bytes = self.read_file(&path)?;
        String::from_utf8(bytes).with_context(|| format!("File '{path}' is not valid UTF-8"))
    }

    /// Write a whole file. Internal metadata and content-addressed object
    /// paths are written verbatim with their engine-prefixed path
    /// preserved; ordinary UTF-8 content goes through the backend's text
    /// path.
    pub fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let path = paths::normalize(path);
        if paths::is_internal_path(&path) || path.split('/').any(|seg| seg == "objects") {
            return self.backend.write_binary(&path, data);
        }
        match std::str::from_utf8(data) {
            Ok(text) => self.backend.write_text(&path, text),
            Err(_) => self.backend.write_binary(&path, data),
        }
    }

    /// List entry names under a path. User-visible directories are
    /// filtered of transient editor/lock/temp artifacts; internal metadata
    /// listings are returned raw.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let path = paths::normalize(path);
        if !path.is_empty() && !self.backend.directory_exists(&path) {
            return Err(paths::not_found(&path).into());
        }
        let names: Vec<String> = self
            .backend
            .list_entries(&path)?
            .into_iter()
            .map(|e| e.name)
            .collect();
        if paths::is_internal_path(&path) {
            Ok(names)
        } else {
            Ok(paths::filter_transient(names))
        }
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.backend.create_dir(&paths::normalize(path))
    }

    /// Existence probe; never errors.
    pub fn exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        if path.is_empty() {
            return true;
        }
        match self.backend.read_binary(&path) {
            Ok(Some(_)) => true,
            _ => self.backend.directory_exists(&path),
        }
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        let path = paths::normalize(path);
        if self.backend.read_binary(&path)?.is_none() {
            return Err(paths::not_found(&path).into());
        }
        self.backend.delete(&path)
    }

    /// Synthesize file metadata. The root path always reports as an
    /// existing directory even before anything has been written.
    pub fn stat(&self, path: &str) -> Result<Stat> {
        let path = paths::normalize(path);
        if path.is_empty() {
            return Ok(Stat {
                kind: NodeKind::Directory,
                size: 0,
                mtime_ms: 0,
                ctime_ms: 0,
            });
        }
        if let Some(bytes) = self.backend.read_binary(&path)? {
            return Ok(Stat {
                kind: NodeKind::File,
                size: bytes.len() as u64,
                mtime_ms: 0,
                ctime_ms: 0,
            });
        }
        if self.backend.directory_exists(&path) {
            return Ok(Stat {
                kind: NodeKind::Directory,
                size: 0,
                mtime_ms: 0,
                ctime_ms: 0,
            });
        }
        Err(paths::not_found(&path).into())
    }

    /// Identical to [`Vfs::stat`]: the backends cannot hold symlinks, so
    /// there is nothing to report without following.
    pub fn lstat(&self, path: &str) -> Result<Stat> {
        self.stat(path)
    }

    pub fn symlink(&self, _target: &str, _path: &str) -> Result<()> {
        Err(anyhow!("Symbolic links are not supported by this filesystem"))
    }

    pub fn readlink(&self, path: &str) -> Result<String> {
        Err(anyhow!(
            "Symbolic links are not supported by this filesystem ('{path}')"
        ))
    }
}
