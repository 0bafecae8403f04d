//! A single-file, mmap-backed, append-only write-ahead log.
//!
//! A [`Log`] assigns each appended payload a monotonically increasing
//! 64-bit index and stores it as a self-delimited frame in one
//! memory-mapped file. Records are looked up by a forward scan — there
//! is no secondary index — which keeps the on-disk format and the
//! recovery path simple at the cost of `O(k)` lookups.
//!
//! ```no_run
//! use kimberlite_wal::Log;
//!
//! # fn main() -> Result<(), kimberlite_wal::WalError> {
//! let log = Log::open("events.wal", None)?;
//! let index = log.append(b"hello")?;
//! assert_eq!(log.read(index)?, b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! # Non-goals
//!
//! No multi-file segmentation, no checksums, no compression, no
//! multi-process writers, and no secondary index. See the crate's
//! design notes for the reasoning behind each.

mod codec;
mod error;
mod log;
mod mapped_file;
mod options;
mod store;

pub use codec::{Header, HEADER_SIZE};
pub use error::{Result, WalError};
pub use log::Log;
pub use options::WalOptions;
pub use store::Item;
