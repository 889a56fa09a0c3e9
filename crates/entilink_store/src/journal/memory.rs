//! In-memory journal for tests and ephemeral stores.

use super::Journal;
use crate::error::StoreResult;

/// A journal kept entirely in memory.
///
/// Data is lost when the journal is dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    data: Vec<u8>,
}

impl MemoryJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a journal holding `data`, e.g. a copy of another journal.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Journal for MemoryJournal {
    fn read_all(&self) -> StoreResult<Vec<u8>> {
        Ok(self.data.clone())
    }

    fn append(&mut self, data: &[u8]) -> StoreResult<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn sync(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        self.data.truncate(len as usize);
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StoreResult<()> {
        self.data = data.to_vec();
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.data.len() as u64)
    }
}
