//! A byte-addressable, growable window over a backing file.
//!
//! [`MappedFile`] owns exactly one file handle and one memory mapping.
//! The mapping's capacity is fixed at construction time (the largest the
//! log will ever grow to); the file's on-disk length is truncated up to
//! that capacity immediately so every mapped page is backed, avoiding a
//! `SIGBUS` on first touch. Capacity is never revisited after that: a
//! write that would exceed it fails with [`WalError::OutOfSize`] rather
//! than triggering a remap.
//!
//! Concurrency is a single readers-writer lock guarding the mapping and
//! its two cursors (`write_offset`, `logical_size`). Reads take the
//! shared mode; every mutating operation takes the exclusive mode for
//! its full duration, so a reader never observes a write straddling two
//! lock acquisitions.

use std::fs::{File, OpenOptions};
use std::io::SeekFrom;
use std::path::Path;
use std::sync::RwLock;

use memmap2::MmapMut;

use crate::error::{Result, WalError};

#[cfg(unix)]
const CREATE_MODE: u32 = 0o664;

struct MappedState {
    mmap: MmapMut,
    write_offset: u64,
    logical_size: u64,
}

/// A fixed-capacity memory-mapped byte region backed by a single file.
pub struct MappedFile {
    file: File,
    capacity: u64,
    preexisting_len: u64,
    state: RwLock<MappedState>,
}

impl MappedFile {
    /// Opens (creating if necessary) the file at `path` and maps it for
    /// `capacity` bytes.
    pub fn open(path: impl AsRef<Path>, capacity: u64) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(CREATE_MODE);
        }
        let file = options.open(path)?;
        let preexisting_len = file.metadata()?.len();

        // The mapping below covers `capacity` bytes regardless of the
        // file's prior length, so every page in that range must already
        // be backed by the file before it is touched.
        file.set_len(capacity)?;

        // SAFETY: `file` was just opened read/write and `set_len` to at
        // least `capacity` bytes, so mapping the full file is valid.
        // Nothing else holds a mapping over this file within this
        // process; concurrent access from other processes is out of
        // scope (single-writer model).
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        tracing::debug!(capacity, "mapped file opened");

        Ok(Self {
            file,
            capacity,
            preexisting_len,
            state: RwLock::new(MappedState {
                mmap,
                write_offset: 0,
                logical_size: 0,
            }),
        })
    }

    /// The fixed capacity of the mapping in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// The file's length as it was *before* this open call truncated it
    /// up to capacity. Zero means the file was newly created. Used only
    /// during log bootstrap to tell a fresh file apart from a reopened
    /// one before any header has been validated.
    pub fn preexisting_len(&self) -> u64 {
        self.preexisting_len
    }

    /// Sets the write cursor and logical size directly. Used once during
    /// log bootstrap to restore state recovered by scanning a reopened
    /// file's contents; never used mid-lifetime.
    pub fn set_cursors(&self, write_offset: u64, logical_size: u64) {
        let mut state = self.state.write().unwrap();
        state.write_offset = write_offset;
        state.logical_size = logical_size;
    }

    /// The number of meaningful bytes at the start of the mapping.
    pub fn logical_size(&self) -> u64 {
        self.state.read().unwrap().logical_size
    }

    /// The current write cursor.
    pub fn write_offset(&self) -> u64 {
        self.state.read().unwrap().write_offset
    }

    /// Copies `dst.len()` bytes starting at `off` into `dst`.
    pub fn read_at(&self, dst: &mut [u8], off: u64) -> Result<()> {
        let end = off
            .checked_add(dst.len() as u64)
            .ok_or(WalError::OutOfSize {
                requested: dst.len() as u64,
                offset: off,
                capacity: self.capacity,
            })?;
        if end > self.capacity {
            return Err(WalError::OutOfSize {
                requested: dst.len() as u64,
                offset: off,
                capacity: self.capacity,
            });
        }
        let state = self.state.read().unwrap();
        dst.copy_from_slice(&state.mmap[off as usize..end as usize]);
        Ok(())
    }

    /// Copies `src` into the mapping starting at `off`. Does not move
    /// the write cursor or `logical_size`; callers that want those
    /// updated use [`MappedFile::append`].
    pub fn write_at(&self, src: &[u8], off: u64) -> Result<()> {
        let end = off
            .checked_add(src.len() as u64)
            .ok_or(WalError::OutOfSize {
                requested: src.len() as u64,
                offset: off,
                capacity: self.capacity,
            })?;
        if end > self.capacity {
            return Err(WalError::OutOfSize {
                requested: src.len() as u64,
                offset: off,
                capacity: self.capacity,
            });
        }
        let mut state = self.state.write().unwrap();
        state.mmap[off as usize..end as usize].copy_from_slice(src);
        Ok(())
    }

    /// Writes `src` at the current write cursor, then advances the
    /// cursor and `logical_size` by `src.len()`. Returns the offset at
    /// which `src` was written.
    pub fn append(&self, src: &[u8]) -> Result<u64> {
        let mut state = self.state.write().unwrap();
        let off = state.write_offset;
        let end = off
            .checked_add(src.len() as u64)
            .ok_or(WalError::OutOfSize {
                requested: src.len() as u64,
                offset: off,
                capacity: self.capacity,
            })?;
        if end > self.capacity {
            return Err(WalError::OutOfSize {
                requested: src.len() as u64,
                offset: off,
                capacity: self.capacity,
            });
        }
        state.mmap[off as usize..end as usize].copy_from_slice(src);
        state.write_offset = end;
        state.logical_size = state.logical_size.max(end);
        Ok(off)
    }

    /// Moves the write cursor per `std::io::SeekFrom` semantics and
    /// returns the new cursor position.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let mut state = self.state.write().unwrap();
        let new_offset = match pos {
            SeekFrom::Start(off) => off,
            SeekFrom::End(back) => {
                if back > state.logical_size as i64 {
                    return Err(WalError::InvalidData("seek before start of mapping"));
                }
                (state.logical_size as i64 - back) as u64
            }
            SeekFrom::Current(delta) => {
                let base = state.write_offset as i64;
                let result = base + delta;
                if result < 0 {
                    return Err(WalError::InvalidData("seek before start of mapping"));
                }
                result as u64
            }
        };
        if new_offset > self.capacity {
            return Err(WalError::OutOfSize {
                requested: 0,
                offset: new_offset,
                capacity: self.capacity,
            });
        }
        state.write_offset = new_offset;
        Ok(new_offset)
    }

    /// Shifts the byte range `[hi, logical_size)` left to start at `lo`,
    /// shrinking `logical_size` and `write_offset` by `hi - lo`. Bytes
    /// are not zeroed past the new `logical_size`; they are simply
    /// unreachable since every scan stops at `logical_size`.
    pub fn remove(&self, lo: u64, hi: u64) -> Result<()> {
        debug_assert!(lo <= hi, "remove: lo must not exceed hi");
        let mut state = self.state.write().unwrap();
        debug_assert!(
            hi <= state.logical_size,
            "remove: hi must not exceed logical_size"
        );
        let shift = hi - lo;
        if shift == 0 {
            return Ok(());
        }
        let tail_len = (state.logical_size - hi) as usize;
        // copy_within handles overlapping ranges correctly (moves left).
        state
            .mmap
            .copy_within(hi as usize..hi as usize + tail_len, lo as usize);
        state.logical_size -= shift;
        state.write_offset -= shift;
        Ok(())
    }

    /// Flushes dirty mapped pages to the backing file.
    pub fn sync(&self) -> Result<()> {
        let state = self.state.write().unwrap();
        state.mmap.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Ok(state) = self.state.write() {
            if let Err(err) = state.mmap.flush() {
                tracing::warn!(%err, "failed to flush mapped file on drop");
            }
        }
    }
}
