//! # EntiLink Testkit
//!
//! Test utilities for EntiLink.
//!
//! This crate provides:
//! - The library model fixture (`Author 1-n Book n-n Tag`)
//! - Temporary stores, in memory or in a temp directory
//! - Recording doubles that count every fetch and controller call
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entilink_testkit::prelude::*;
//!
//! #[test]
//! fn loads_lazily() {
//!     let access = RecordingAccess::new(library());
//!     access.insert(book_row(5, "Emma"));
//!     // ...
//!     assert_eq!(access.get_many_calls().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
