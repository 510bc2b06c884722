//! Sources of external resource bytes.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

/// Supplies the bytes behind a non-`data:` URI while reading.
///
/// Called synchronously; implementations may block.
pub trait ByteResolver {
    fn resolve(&self, uri: &str) -> io::Result<Vec<u8>>;
}

/// Resolver over an in-memory name -> bytes map, e.g. the resources of a
/// [`WriteOutput`](crate::io::WriteOutput).
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) -> &mut Self {
        self.files.insert(uri.into(), bytes);
        self
    }
}

impl From<BTreeMap<String, Vec<u8>>> for MemoryResolver {
    fn from(files: BTreeMap<String, Vec<u8>>) -> Self {
        Self { files }
    }
}

impl ByteResolver for MemoryResolver {
    fn resolve(&self, uri: &str) -> io::Result<Vec<u8>> {
        self.files.get(uri).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no resource named '{uri}'"))
        })
    }
}

/// Resolver reading files relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsResolver {
    base: PathBuf,
}

impl FsResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl ByteResolver for FsResolver {
    fn resolve(&self, uri: &str) -> io::Result<Vec<u8>> {
        let path = self.base.join(uri);
        tracing::debug!("Resolving {} from {}", uri, path.display());
        std::fs::read(path)
    }
}

/// Resolver for self-contained inputs; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ByteResolver for NoResolver {
    fn resolve(&self, uri: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("external resource '{uri}' requested without a resolver"),
        ))
    }
}
