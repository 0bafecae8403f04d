//! The public write-ahead log: open, append, read, enumerate, truncate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::codec::{self, Header, FRAME_OVERHEAD, HEADER_SIZE};
use crate::error::{Result, WalError};
use crate::mapped_file::MappedFile;
use crate::options::WalOptions;
use crate::store::{self, Item};

struct LogState {
    first_index: u64,
    last_index: u64,
}

/// A single-file, mmap-backed, append-only log addressed by a
/// monotonically increasing 64-bit index.
///
/// Reads (`read`, `read_batch`, `items`, `item`, `first`, `last`) may
/// run concurrently with each other. Writes (`append`, `truncate_front`)
/// are serialized against reads and each other.
pub struct Log {
    mapped: MappedFile,
    state: RwLock<LogState>,
    closed: AtomicBool,
}

impl Log {
    /// Opens the log file at `path`, creating it if it does not exist.
    ///
    /// A brand new file is initialized with a fresh header. An existing
    /// file is validated against the current format's magic and
    /// version, failing with [`WalError::FileCorrupt`] on mismatch, and
    /// its prior content is recovered by scanning forward from the
    /// header to the first zeroed frame.
    pub fn open(path: impl AsRef<Path>, opts: Option<WalOptions>) -> Result<Self> {
        let opts = opts.unwrap_or_default();
        let mapped = MappedFile::open(path.as_ref(), opts.mmap_size())?;

        let (first_index, last_index) = if mapped.preexisting_len() == 0 {
            let header = Header::fresh();
            mapped.write_at(&codec::encode_header(&header), 0)?;
            mapped.set_cursors(HEADER_SIZE, HEADER_SIZE);
            tracing::debug!(
                path = %path.as_ref().display(),
                mmap_size = opts.mmap_size(),
                "created new log"
            );
            (0, 0)
        } else {
            let mut header_buf = [0u8; HEADER_SIZE as usize];
            mapped.read_at(&mut header_buf, 0)?;
            let header = codec::decode_header(&header_buf)?;
            if !header.is_valid() {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    version = header.version,
                    magic = header.magic,
                    "log header failed validation"
                );
                return Err(WalError::FileCorrupt("header magic or version mismatch"));
            }
            let logical_size = recover_logical_size(&mapped)?;
            mapped.set_cursors(logical_size, logical_size);
            tracing::debug!(
                path = %path.as_ref().display(),
                head = header.head,
                tail = header.tail,
                "reopened existing log"
            );
            (header.head, header.tail)
        };

        Ok(Self {
            mapped,
            state: RwLock::new(LogState {
                first_index,
                last_index,
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// Appends `payload`, assigning it the index `last_index + 1`.
    /// Returns the assigned index.
    ///
    /// The header rewrite and the frame append happen under one
    /// exclusive critical section: a concurrent reader never observes
    /// a `tail` advertising an index it cannot yet locate.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let mut state = self.state.write().unwrap();
        let index = state.last_index + 1;
        let frame = codec::encode_record(index, payload)?;

        // The frame must be committed before the header is rewritten to
        // advertise it: if `append` below fails with `OutOfSize`, nothing
        // has been written yet and `last_index`/the header are untouched.
        self.mapped.append(&frame)?;

        let header = Header {
            version: codec::VERSION,
            magic: codec::MAGIC,
            head: if state.first_index == 0 { index } else { state.first_index },
            tail: index,
        };
        self.mapped.write_at(&codec::encode_header(&header), 0)?;

        state.first_index = header.head;
        state.last_index = index;
        tracing::trace!(index, len = payload.len(), "appended record");
        Ok(index)
    }

    /// Reads the payload stored at `index`.
    pub fn read(&self, index: u64) -> Result<Vec<u8>> {
        let _state = self.state.read().unwrap();
        let item = store::find(&self.mapped, index)?;
        let data = store::read_item(&self.mapped, &item)?;
        tracing::trace!(index, len = data.len(), "read record");
        Ok(data)
    }

    /// Reads every payload in `indices` in a single forward pass over
    /// the log. Indices not present in the log are omitted from the
    /// result.
    pub fn read_batch(&self, indices: &[u64]) -> Result<HashMap<u64, Vec<u8>>> {
        let _state = self.state.read().unwrap();
        let found = store::find_many(&self.mapped, indices)?;
        found
            .into_iter()
            .map(|(idx, item)| store::read_item(&self.mapped, &item).map(|data| (idx, data)))
            .collect()
    }

    /// Returns a descriptor for the record at `index` without reading
    /// its payload.
    pub fn item(&self, index: u64) -> Result<Item> {
        let _state = self.state.read().unwrap();
        store::find(&self.mapped, index)
    }

    /// Returns descriptors for every live record, oldest first.
    pub fn items(&self) -> Result<Vec<Item>> {
        let _state = self.state.read().unwrap();
        store::scan(&self.mapped)
    }

    /// Returns the oldest live record's index and payload, if any.
    pub fn first(&self) -> Result<Option<(u64, Vec<u8>)>> {
        let _state = self.state.read().unwrap();
        match store::first(&self.mapped)? {
            Some(item) => Ok(Some((item.index, store::read_item(&self.mapped, &item)?))),
            None => Ok(None),
        }
    }

    /// Returns the newest live record's index and payload, if any.
    pub fn last(&self) -> Result<Option<(u64, Vec<u8>)>> {
        let _state = self.state.read().unwrap();
        match store::last(&self.mapped)? {
            Some(item) => Ok(Some((item.index, store::read_item(&self.mapped, &item)?))),
            None => Ok(None),
        }
    }

    /// The index of the oldest live record, or `0` if the log is empty.
    pub fn first_index(&self) -> u64 {
        self.state.read().unwrap().first_index
    }

    /// The index of the newest live record, or `0` if the log is empty.
    pub fn last_index(&self) -> u64 {
        self.state.read().unwrap().last_index
    }

    /// Removes every record with index strictly less than `index`.
    /// Fails with [`WalError::NotFound`] if `index` is not present, and
    /// leaves the log unmodified in that case.
    pub fn truncate_front(&self, index: u64) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let item = store::find(&self.mapped, index)?;
        store::remove_before(&self.mapped, &item)?;

        let header = Header {
            version: codec::VERSION,
            magic: codec::MAGIC,
            head: index,
            tail: state.last_index,
        };
        self.mapped.write_at(&codec::encode_header(&header), 0)?;

        tracing::info!(old_head = state.first_index, new_head = index, "truncated log prefix");
        state.first_index = index;
        Ok(())
    }

    /// Flushes dirty mapped pages to disk.
    pub fn sync(&self) -> Result<()> {
        self.mapped.sync()
    }

    /// Closes the log, flushing pending writes first.
    pub fn close(self) -> Result<()> {
        self.closed.store(true, Ordering::Relaxed);
        self.mapped.sync()
    }
}

impl Drop for Log {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        tracing::warn!("log dropped without an explicit close(); syncing best-effort");
        if let Err(err) = self.mapped.sync() {
            tracing::error!(error = %err, "failed to sync log during drop");
        }
    }
}

/// Scans forward from the header to recover how many bytes of a
/// reopened file hold live frames, stopping at the first zeroed
/// `rsize` or at the file's previously persisted length, whichever
/// comes first.
fn recover_logical_size(mapped: &MappedFile) -> Result<u64> {
    let limit = mapped.preexisting_len().min(mapped.capacity());
    let mut pos = HEADER_SIZE;
    while pos < limit {
        let mut rsize_buf = [0u8; 4];
        mapped.read_at(&mut rsize_buf, pos)?;
        let rsize = u32::from_be_bytes(rsize_buf);
        if rsize == 0 || (rsize as u64) < FRAME_OVERHEAD {
            break;
        }
        let next = pos + rsize as u64;
        if next > limit {
            break;
        }
        pos = next;
    }
    Ok(pos)
}
