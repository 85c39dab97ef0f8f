//! Random-access view over a downloaded log bundle.
//!
//! The bundle is a zip archive. Opening it only parses the central
//! directory; an entry is inflated when it is requested and is then read in
//! full into an owned buffer.

use std::fmt;
use std::io::{Cursor, Read};

use bytes::Bytes;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Result, RunLogError};

/// Cap on the up-front allocation for an entry, whatever size it declares.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// An opened log bundle.
///
/// Cloning the inner archive shares the parsed central directory and the
/// underlying bytes, so entry reads only need `&self`.
#[derive(Clone)]
pub struct LogArchive {
    zip: ZipArchive<Cursor<Bytes>>,
}

impl LogArchive {
    /// Parse `bytes` as a zip archive.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let zip = ZipArchive::new(Cursor::new(bytes.into()))
            .map_err(|e| RunLogError::ArchiveFormat(e.to_string()))?;
        Ok(LogArchive { zip })
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.is_empty()
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    /// Inflate one entry into an owned buffer.
    ///
    /// Fails with [`RunLogError::MissingEntry`] for an unknown name and with
    /// [`RunLogError::TruncatedArchive`] when the entry cannot be read to its
    /// declared size or fails its checksum.
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let truncated = |reason: String| RunLogError::TruncatedArchive {
            entry: name.to_string(),
            reason,
        };

        let mut zip = self.zip.clone();
        let mut file = zip.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => RunLogError::MissingEntry(name.to_string()),
            other => truncated(other.to_string()),
        })?;

        let declared = file.size();
        let mut buf = Vec::with_capacity(declared.min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut buf)
            .map_err(|e| truncated(e.to_string()))?;

        if buf.len() as u64 != declared {
            return Err(truncated(format!(
                "read {} of {} declared bytes",
                buf.len(),
                declared
            )));
        }
        Ok(buf)
    }
}

impl fmt::Debug for LogArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogArchive")
            .field("entries", &self.zip.len())
            .finish()
    }
}
