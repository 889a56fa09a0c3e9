//! Property-based test generators using proptest.
//!
//! Provides strategies for generating library rows and operation
//! sequences that respect the library model.

use crate::fixtures::{author_row, book_row, tag_row};
use entilink_core::{EntityId, TransferObject};
use proptest::prelude::*;

/// Strategy for assigned entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    (0i64..10_000).prop_map(EntityId::new)
}

/// Strategy for sentinel ids.
pub fn sentinel_id_strategy() -> impl Strategy<Value = EntityId> {
    (i64::MIN..0).prop_map(EntityId::new)
}

/// Strategy for book titles that fit the model.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z ]{0,40}").expect("Invalid regex")
}

/// Strategy for distinct id lists of up to `max` entries.
pub fn id_list_strategy(max: usize) -> impl Strategy<Value = Vec<EntityId>> {
    prop::collection::btree_set(0i64..1_000, 0..=max)
        .prop_map(|set| set.into_iter().map(EntityId::new).collect())
}

/// Strategy for a library row of any type.
pub fn library_row_strategy() -> impl Strategy<Value = TransferObject> {
    (0i64..100, title_strategy(), 0usize..3).prop_map(|(id, text, kind)| match kind {
        0 => author_row(id, &text.chars().take(32).collect::<String>()),
        1 => book_row(id, &text),
        _ => tag_row(id, &text.chars().take(16).collect::<String>()),
    })
}

/// One step of a random workload against a pipeline.
#[derive(Debug, Clone)]
pub enum LibraryOp {
    /// Create a book with a title.
    CreateBook(String),
    /// Rename the book at an index of the created list.
    Rename(usize, String),
    /// Delete the book at an index of the created list.
    Delete(usize),
    /// Read the book at an index of the created list by id.
    Read(usize),
}

/// Strategy for a single workload step.
pub fn library_op_strategy() -> impl Strategy<Value = LibraryOp> {
    prop_oneof![
        3 => title_strategy().prop_map(LibraryOp::CreateBook),
        2 => (any::<usize>(), title_strategy()).prop_map(|(i, t)| LibraryOp::Rename(i, t)),
        1 => any::<usize>().prop_map(LibraryOp::Delete),
        2 => any::<usize>().prop_map(LibraryOp::Read),
    ]
}

/// Strategy for a workload of up to `max` steps.
pub fn library_ops_strategy(max: usize) -> impl Strategy<Value = Vec<LibraryOp>> {
    prop::collection::vec(library_op_strategy(), 1..=max)
}
