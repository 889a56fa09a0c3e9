//! Journal backends.
//!
//! A journal is an opaque, append-only byte log. The store owns the frame
//! format; journals only read, append, truncate and atomically replace.

mod file;
mod memory;

pub use file::{FileJournal, JOURNAL_FILE};
pub use memory::MemoryJournal;

use crate::error::StoreResult;

/// Append-only byte log backing a store.
///
/// # Invariants
///
/// - `read_all` returns exactly the bytes appended since the last `replace`
/// - `sync` makes every appended byte durable
/// - `replace` swaps the whole content atomically
pub trait Journal: Send + Sync {
    /// Reads the whole journal.
    fn read_all(&self) -> StoreResult<Vec<u8>>;

    /// Appends bytes at the end.
    fn append(&mut self, data: &[u8]) -> StoreResult<()>;

    /// Flushes appended bytes to durable storage.
    fn sync(&mut self) -> StoreResult<()>;

    /// Drops everything after `len` bytes.
    fn truncate(&mut self, len: u64) -> StoreResult<()>;

    /// Atomically replaces the whole content.
    fn replace(&mut self, data: &[u8]) -> StoreResult<()>;

    /// Current size in bytes.
    fn size(&self) -> StoreResult<u64>;
}
