//! Forward-scanning record store built on top of [`MappedFile`].
//!
//! There is no secondary index: looking up a record by its logical
//! index costs a linear scan over the frames preceding it. This keeps
//! the on-disk format simple at the expense of `O(k)` lookups, which is
//! an explicit trade-off, not an oversight.

use std::collections::HashMap;

use crate::codec::{self, FRAME_OVERHEAD, HEADER_SIZE};
use crate::error::{Result, WalError};
use crate::mapped_file::MappedFile;

/// The location and identity of one record frame, as discovered by a
/// scan. Never persisted; reconstructed on every traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Byte offset of the frame's leading `rsize` field.
    pub byte_offset: u64,
    /// Total frame length in bytes, including both `rsize` copies.
    pub byte_length: u64,
    /// The record's logical index.
    pub index: u64,
}

/// Reads the 4-byte `rsize` field at `offset`.
fn read_rsize(mapped: &MappedFile, offset: u64) -> Result<u32> {
    let mut buf = [0u8; 4];
    mapped.read_at(&mut buf, offset)?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads the 8-byte index field immediately following a frame's leading
/// `rsize`, at `offset + 4`.
fn read_index(mapped: &MappedFile, offset: u64) -> Result<u64> {
    let mut buf = [0u8; 8];
    mapped.read_at(&mut buf, offset + 4)?;
    Ok(u64::from_be_bytes(buf))
}

/// Walks every frame from `HEADER_SIZE` to `logical_size`, stopping
/// early at a zeroed `rsize` (end-of-log sentinel) even if it precedes
/// `logical_size`.
pub fn scan(mapped: &MappedFile) -> Result<Vec<Item>> {
    let logical_size = mapped.logical_size();
    let mut items = Vec::new();
    let mut pos = HEADER_SIZE;
    while pos < logical_size {
        let rsize = read_rsize(mapped, pos)?;
        if rsize == 0 {
            break;
        }
        let index = read_index(mapped, pos)?;
        items.push(Item {
            byte_offset: pos,
            byte_length: rsize as u64,
            index,
        });
        pos += rsize as u64;
    }
    Ok(items)
}

/// Scans forward for the single frame whose index matches `target`.
/// Stops as soon as it is found, without materializing the full scan.
pub fn find(mapped: &MappedFile, target: u64) -> Result<Item> {
    let logical_size = mapped.logical_size();
    let mut pos = HEADER_SIZE;
    while pos < logical_size {
        let rsize = read_rsize(mapped, pos)?;
        if rsize == 0 {
            break;
        }
        let index = read_index(mapped, pos)?;
        if index == target {
            return Ok(Item {
                byte_offset: pos,
                byte_length: rsize as u64,
                index,
            });
        }
        pos += rsize as u64;
    }
    Err(WalError::NotFound(target))
}

/// Scans forward exactly once, returning every item whose index is in
/// `targets`. Missing indices are simply absent from the result.
pub fn find_many(mapped: &MappedFile, targets: &[u64]) -> Result<HashMap<u64, Item>> {
    let logical_size = mapped.logical_size();
    let mut found = HashMap::with_capacity(targets.len());
    let mut pos = HEADER_SIZE;
    while pos < logical_size && found.len() < targets.len() {
        let rsize = read_rsize(mapped, pos)?;
        if rsize == 0 {
            break;
        }
        let index = read_index(mapped, pos)?;
        if targets.contains(&index) {
            found.insert(
                index,
                Item {
                    byte_offset: pos,
                    byte_length: rsize as u64,
                    index,
                },
            );
        }
        pos += rsize as u64;
    }
    Ok(found)
}

/// The first (oldest) frame in the log, if any.
pub fn first(mapped: &MappedFile) -> Result<Option<Item>> {
    let logical_size = mapped.logical_size();
    if logical_size <= HEADER_SIZE {
        return Ok(None);
    }
    let rsize = read_rsize(mapped, HEADER_SIZE)?;
    if rsize == 0 {
        return Ok(None);
    }
    let index = read_index(mapped, HEADER_SIZE)?;
    Ok(Some(Item {
        byte_offset: HEADER_SIZE,
        byte_length: rsize as u64,
        index,
    }))
}

/// The last (newest) frame in the log, if any.
///
/// Found by reading the trailing `rsize` copy at `logical_size - 4`,
/// then deriving the frame's start from that length — not by scanning
/// from the front.
pub fn last(mapped: &MappedFile) -> Result<Option<Item>> {
    let logical_size = mapped.logical_size();
    if logical_size <= HEADER_SIZE {
        return Ok(None);
    }
    let mut trailer = [0u8; 4];
    mapped.read_at(&mut trailer, logical_size - 4)?;
    let rsize = u32::from_be_bytes(trailer);
    if (rsize as u64) < FRAME_OVERHEAD || rsize as u64 > logical_size - HEADER_SIZE {
        return Err(WalError::InvalidData("trailing rsize inconsistent with logical size"));
    }
    let byte_offset = logical_size - rsize as u64;
    let index = read_index(mapped, byte_offset)?;
    Ok(Some(Item {
        byte_offset,
        byte_length: rsize as u64,
        index,
    }))
}

/// Reads the payload of `item` out of `mapped`.
pub fn read_item(mapped: &MappedFile, item: &Item) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; item.byte_length as usize];
    mapped.read_at(&mut buf, item.byte_offset)?;
    let rsize = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    let (_, data) = codec::decode_record(rsize, &buf[4..])?;
    Ok(data.to_vec())
}

/// Removes every frame strictly before `item`'s offset by shifting the
/// remainder of the log left over it.
pub fn remove_before(mapped: &MappedFile, item: &Item) -> Result<()> {
    mapped.remove(HEADER_SIZE, item.byte_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fresh() -> (MappedFile, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let mapped = MappedFile::open(file.path(), 1 << 20).unwrap();
        mapped.append(&codec::encode_header(&codec::Header::fresh())).unwrap();
        (mapped, file)
    }

    fn append_payload(mapped: &MappedFile, index: u64, data: &[u8]) {
        let frame = codec::encode_record(index, data).unwrap();
        mapped.append(&frame).unwrap();
    }

    #[test]
    fn scan_finds_all_frames_in_order() {
        let (mapped, _guard) = fresh();
        for (i, payload) in ["first", "-second", "-thrid", "-fourth", "-fifth"]
            .iter()
            .enumerate()
        {
            append_payload(&mapped, i as u64 + 1, payload.as_bytes());
        }
        let items = scan(&mapped).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(
            items.iter().map(|i| i.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn find_locates_middle_record() {
        let (mapped, _guard) = fresh();
        for (i, payload) in ["first", "-second", "-thrid"].iter().enumerate() {
            append_payload(&mapped, i as u64 + 1, payload.as_bytes());
        }
        let item = find(&mapped, 2).unwrap();
        assert_eq!(item.index, 2);
        let data = read_item(&mapped, &item).unwrap();
        assert_eq!(data, b"-second");
    }

    #[test]
    fn find_missing_index_is_not_found() {
        let (mapped, _guard) = fresh();
        append_payload(&mapped, 1, b"only");
        let err = find(&mapped, 99).unwrap_err();
        assert!(matches!(err, WalError::NotFound(99)));
    }

    #[test]
    fn last_reads_trailing_frame_without_scanning() {
        let (mapped, _guard) = fresh();
        append_payload(&mapped, 1, b"hello");
        append_payload(&mapped, 2, b"mobus11");
        append_payload(&mapped, 3, b"world111");
        let item = last(&mapped).unwrap().unwrap();
        assert_eq!(item.index, 3);
        assert_eq!(read_item(&mapped, &item).unwrap(), b"world111");
    }

    #[test]
    fn first_reads_leading_frame() {
        let (mapped, _guard) = fresh();
        append_payload(&mapped, 1, b"hello");
        append_payload(&mapped, 2, b"world");
        let item = first(&mapped).unwrap().unwrap();
        assert_eq!(item.index, 1);
    }

    #[test]
    fn empty_log_has_no_first_or_last() {
        let (mapped, _guard) = fresh();
        assert!(first(&mapped).unwrap().is_none());
        assert!(last(&mapped).unwrap().is_none());
    }

    #[test]
    fn remove_before_drops_leading_frames() {
        let (mapped, _guard) = fresh();
        for (i, payload) in ["first", "-second", "-thrid", "-fourth", "-fifth"]
            .iter()
            .enumerate()
        {
            append_payload(&mapped, i as u64 + 1, payload.as_bytes());
        }
        let cut = find(&mapped, 3).unwrap();
        remove_before(&mapped, &cut).unwrap();
        let items = scan(&mapped).unwrap();
        assert_eq!(
            items.iter().map(|i| i.index).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
        assert!(find(&mapped, 1).is_err());
        let remaining = find(&mapped, 3).unwrap();
        assert_eq!(read_item(&mapped, &remaining).unwrap(), b"-thrid");
    }

    #[test]
    fn find_many_returns_exact_subset_in_one_pass() {
        let (mapped, _guard) = fresh();
        for (i, payload) in ["first", "-second", "-thrid", "-fourth", "-fifth"]
            .iter()
            .enumerate()
        {
            append_payload(&mapped, i as u64 + 1, payload.as_bytes());
        }
        let found = find_many(&mapped, &[1, 3, 4]).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.contains_key(&1));
        assert!(found.contains_key(&3));
        assert!(found.contains_key(&4));
        assert!(!found.contains_key(&2));
    }
}
