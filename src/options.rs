//! Configuration for opening a log.

/// The default and minimum mmap capacity: 1 GiB.
pub const DEFAULT_MMAP_SIZE: u64 = 1 << 30;

/// Options controlling how a [`crate::Log`] is opened.
#[derive(Debug, Clone, Copy)]
pub struct WalOptions {
    mmap_size: u64,
}

impl WalOptions {
    /// Creates options with the given mmap capacity, clamped up to
    /// [`DEFAULT_MMAP_SIZE`] if smaller.
    pub fn new(mmap_size: u64) -> Self {
        let clamped = mmap_size.max(DEFAULT_MMAP_SIZE);
        if clamped != mmap_size {
            tracing::debug!(
                requested = mmap_size,
                clamped = clamped,
                "mmap_size below minimum, clamping"
            );
        }
        Self { mmap_size: clamped }
    }

    /// The resolved mmap capacity in bytes.
    pub fn mmap_size(&self) -> u64 {
        self.mmap_size
    }
}

impl Default for WalOptions {
    fn default() -> Self {
        Self {
            mmap_size: DEFAULT_MMAP_SIZE,
        }
    }
}
