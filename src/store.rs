//! Memory-mapped fixed-width record store.
//!
//! The backing file holds exactly [`RECORD_COUNT`](crate::constants::RECORD_COUNT)
//! records of [`FIELD_WIDTH`](crate::constants::FIELD_WIDTH) ASCII bytes plus a
//! trailing newline, so every record lives at a fixed offset and reads and
//! writes never move bytes around. The whole file is mapped read/write and
//! shared by every thread through a readers-writer lock.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use parking_lot::RwLock;
use tracing::info;

use crate::constants::{FIELD_WIDTH, RECORD_COUNT, RECORD_SIZE};
use crate::value::CacheValue;

/// Errors raised while constructing a [`RecordStore`].
///
/// Construction is the only fallible operation: once the file is mapped,
/// per-record reads and writes cannot fail (an unparsable field reads as the
/// value's default).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record file could not be created or initialised.
    #[error("failed to initialise record file {}: {source}", path.display())]
    Init {
        /// Path of the record file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The record file could not be memory-mapped.
    #[error("failed to map record file {}: {source}", path.display())]
    Map {
        /// Path of the record file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// A fixed-size, record-oriented file mapped into memory.
pub struct RecordStore {
    path: PathBuf,
    map: RwLock<MmapMut>,
}

impl RecordStore {
    /// Create (or truncate) the record file at `path` and map it read/write.
    ///
    /// The file is reinitialised to `RECORD_COUNT` blank records: `FIELD_WIDTH`
    /// spaces followed by a newline each. Its size never changes afterwards.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| StoreError::Init {
                path: path.clone(),
                source,
            })?;

        let mut blank = [b' '; RECORD_SIZE];
        blank[FIELD_WIDTH] = b'\n';
        let mut contents = Vec::with_capacity(RECORD_COUNT * RECORD_SIZE);
        for _ in 0..RECORD_COUNT {
            contents.extend_from_slice(&blank);
        }
        file.write_all(&contents)
            .and_then(|()| file.flush())
            .map_err(|source| StoreError::Init {
                path: path.clone(),
                source,
            })?;

        // SAFETY: the file stays open and fixed-size for the mapping's
        // lifetime; all access goes through the RwLock below.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|source| StoreError::Map {
            path: path.clone(),
            source,
        })?;

        info!(
            path = %path.display(),
            records = RECORD_COUNT,
            bytes = contents.len(),
            "record store initialised"
        );

        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of `line`'s field within the file.
    #[inline]
    fn offset(line: u32) -> usize {
        (line as usize - 1) * RECORD_SIZE
    }

    /// Read and decode the record at `line`.
    ///
    /// Takes the shared lock, so concurrent readers do not serialise. A field
    /// that does not parse (e.g. still blank) decodes to `V::default()`.
    pub fn read<V: CacheValue>(&self, line: u32) -> V {
        assert!(
            (1..=RECORD_COUNT as u32).contains(&line),
            "record line {line} out of range"
        );
        let map = self.map.read();
        let offset = Self::offset(line);
        let field = &map[offset..offset + FIELD_WIDTH];
        V::from_field(std::str::from_utf8(field).unwrap_or(""))
    }

    /// Write `text` into the record at `line` under the exclusive lock.
    ///
    /// The field is filled left-aligned: digits, `-` and `.` are copied
    /// verbatim, every other position becomes a space, and anything beyond
    /// `FIELD_WIDTH` characters is dropped. The record's newline is never
    /// touched. The written range is flushed to disk asynchronously;
    /// durability is best effort.
    pub fn write(&self, line: u32, text: &str) {
        assert!(
            (1..=RECORD_COUNT as u32).contains(&line),
            "record line {line} out of range"
        );
        let offset = Self::offset(line);
        let bytes = text.as_bytes();

        let mut map = self.map.write();
        let field = &mut map[offset..offset + FIELD_WIDTH];
        for (position, byte) in field.iter_mut().enumerate() {
            *byte = match bytes.get(position) {
                Some(&b) if b.is_ascii_digit() || b == b'-' || b == b'.' => b,
                _ => b' ',
            };
        }
        let _ = map.flush_async_range(offset, FIELD_WIDTH);
    }
}
