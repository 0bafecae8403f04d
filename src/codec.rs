//! Binary layout for the log header and record frames.
//!
//! Everything on disk is fixed-width, big-endian, and self-delimited: no
//! variable-length varints, no platform-dependent endianness.
//!
//! # Header layout
//!
//! ```text
//! [version:u64][magic:u64][head:u64][tail:u64]
//!      8B           8B        8B        8B
//! ```
//!
//! # Record frame layout
//!
//! ```text
//! [rsize:u32][index:u64][data:bytes][rsize:u32]
//!     4B          8B       variable      4B
//! ```
//!
//! `rsize` is the total frame length (`data.len() + 16`) and is written
//! both before and after the payload so the frame can be read walking
//! forward from its start or backward from its end.

use crate::error::{Result, WalError};

/// Size in bytes of the on-disk header.
pub const HEADER_SIZE: u64 = 32;

/// Format version written by this build.
pub const VERSION: u64 = 1;

/// Magic value identifying a well-formed log file.
pub const MAGIC: u64 = 0xFACE_FACE;

/// Fixed per-frame overhead: leading rsize (4) + index (8) + trailing rsize (4).
pub const FRAME_OVERHEAD: u64 = 16;

/// The largest value a frame's `rsize` field may take before the frame
/// is rejected with [`WalError::OutOfRecordSize`].
pub const MAX_RSIZE: u64 = 1 << 31;

/// The decoded contents of the 32-byte log header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u64,
    pub magic: u64,
    pub head: u64,
    pub tail: u64,
}

impl Header {
    /// The header written into a freshly created log file.
    pub fn fresh() -> Self {
        Self {
            version: VERSION,
            magic: MAGIC,
            head: 0,
            tail: 0,
        }
    }

    /// Whether this header's magic and version match what this build expects.
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }
}

/// Encodes a header into its fixed 32-byte on-disk representation.
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE as usize] {
    let mut buf = [0u8; HEADER_SIZE as usize];
    buf[0..8].copy_from_slice(&header.version.to_be_bytes());
    buf[8..16].copy_from_slice(&header.magic.to_be_bytes());
    buf[16..24].copy_from_slice(&header.head.to_be_bytes());
    buf[24..32].copy_from_slice(&header.tail.to_be_bytes());
    buf
}

/// Decodes a header from its 32-byte on-disk representation.
pub fn decode_header(buf: &[u8]) -> Result<Header> {
    if buf.len() < HEADER_SIZE as usize {
        return Err(WalError::InvalidData("header buffer shorter than 32 bytes"));
    }
    let version = u64::from_be_bytes(buf[0..8].try_into().unwrap());
    let magic = u64::from_be_bytes(buf[8..16].try_into().unwrap());
    let head = u64::from_be_bytes(buf[16..24].try_into().unwrap());
    let tail = u64::from_be_bytes(buf[24..32].try_into().unwrap());
    Ok(Header {
        version,
        magic,
        head,
        tail,
    })
}

/// Encodes a record frame: `rsize || index || data || rsize`.
///
/// Fails with [`WalError::OutOfRecordSize`] if the resulting frame would
/// be `>= MAX_RSIZE` bytes. On failure no partial buffer is returned.
pub fn encode_record(index: u64, data: &[u8]) -> Result<Vec<u8>> {
    let rsize = data.len() as u64 + FRAME_OVERHEAD;
    if rsize >= MAX_RSIZE {
        return Err(WalError::OutOfRecordSize(rsize));
    }
    let rsize = rsize as u32;

    let mut buf = Vec::with_capacity(rsize as usize);
    buf.extend_from_slice(&rsize.to_be_bytes());
    buf.extend_from_slice(&index.to_be_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(&rsize.to_be_bytes());
    Ok(buf)
}

/// Decodes the body of a record frame, i.e. everything after the leading
/// `rsize` field: `index || data || rsize`.
///
/// `rsize` is the frame's total length, used to determine how many bytes
/// of `data` follow the index.
pub fn decode_record(rsize: u32, body: &[u8]) -> Result<(u64, &[u8])> {
    if (rsize as u64) < FRAME_OVERHEAD {
        return Err(WalError::InvalidData("frame rsize smaller than frame overhead"));
    }
    let data_len = (rsize as u64 - FRAME_OVERHEAD) as usize;
    if body.len() < 8 + data_len + 4 {
        return Err(WalError::InvalidData("frame body shorter than its declared rsize"));
    }
    let index = u64::from_be_bytes(body[0..8].try_into().unwrap());
    let data = &body[8..8 + data_len];
    let trailing = u32::from_be_bytes(body[8 + data_len..8 + data_len + 4].try_into().unwrap());
    if trailing != rsize {
        return Err(WalError::InvalidData("leading and trailing rsize disagree"));
    }
    Ok((index, data))
}
