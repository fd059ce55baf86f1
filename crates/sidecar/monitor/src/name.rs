//! Stream file naming convention.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// File extension of sidecar stream files.
pub const SIDECAR_EXTENSION: &str = "rcd";

/// Parsed name of a sidecar stream file, `<prefix>_<index>.rcd`.
///
/// Names order by prefix, then by numeric index, which is the order the node
/// created the files in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SidecarFileName {
    prefix: String,
    index: u32,
}

/// Why a file name is not a sidecar stream file name.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FileNameError {
    /// The file does not carry the sidecar extension; it is ignored silently.
    #[error("not a sidecar stream file")]
    NotSidecar,
    /// The file carries the sidecar extension but the rest of the name is
    /// malformed.
    #[error("malformed sidecar file name: {0}")]
    Malformed(&'static str),
}

impl SidecarFileName {
    /// Create a name from its parts.
    pub fn new(prefix: impl Into<String>, index: u32) -> Self {
        Self { prefix: prefix.into(), index }
    }

    /// Parse a bare file name.
    pub fn parse(name: &str) -> Result<Self, FileNameError> {
        let Some(stem) = name.strip_suffix(SIDECAR_EXTENSION).and_then(|s| s.strip_suffix('.'))
        else {
            return Err(FileNameError::NotSidecar);
        };
        let Some((prefix, index)) = stem.rsplit_once('_') else {
            return Err(FileNameError::Malformed("missing sequence separator"));
        };
        if prefix.is_empty() {
            return Err(FileNameError::Malformed("empty prefix"));
        }
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FileNameError::Malformed("sequence number is not decimal"));
        }
        let index = index.parse().map_err(|_| FileNameError::Malformed("sequence number overflow"))?;
        Ok(Self { prefix: prefix.to_owned(), index })
    }

    /// Parse the file name component of `path`.
    pub fn from_path(path: &Path) -> Result<Self, FileNameError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(FileNameError::Malformed("file name is not valid UTF-8"))?;
        Self::parse(name)
    }

    /// Time-stamp prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Sequence number.
    pub const fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for SidecarFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:02}.{SIDECAR_EXTENSION}", self.prefix, self.index)
    }
}

/// A completed stream file ready for decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarFile {
    /// Parsed file name.
    pub name: SidecarFileName,
    /// Full path of the file.
    pub path: PathBuf,
    /// Size of the file when it was found complete.
    pub len: u64,
}
