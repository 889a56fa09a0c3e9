//! # EntiLink Store
//!
//! Local persistence backend for EntiLink.
//!
//! Rows live in memory and every change is appended to a checksummed
//! journal. Opening a store replays the journal; a torn last frame is
//! dropped, any other damage is reported.
//!
//! ## Layout
//!
//! ```text
//! <dir>/
//!   LOCK          advisory lock held while the store is open
//!   journal.log   framed CBOR records
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = StoreController::open(dir, registry.clone(), StoreConfig::default())?;
//! let pipeline = ControllerBuilder::new(store, registry).with_cache().build();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod journal;
mod record;
mod table;

pub use config::StoreConfig;
pub use controller::{CompactionStats, StoreController, StoreStats};
pub use error::{StoreError, StoreResult};
pub use journal::{FileJournal, Journal, MemoryJournal, JOURNAL_FILE};
pub use record::{compute_crc32, decode_frames, encode_frame, JournalRecord, Replay, MAGIC};
