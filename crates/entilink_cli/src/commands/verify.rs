//! Verify command implementation.

use super::CommandResult;
use entilink_core::{EntityId, TypeRegistry};
use entilink_store::{
    decode_frames, JournalRecord, MemoryJournal, StoreConfig, StoreController, JOURNAL_FILE,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of journal frames read.
    pub frames: usize,
    /// Whether the journal ends in a torn frame.
    pub torn: bool,
    /// Number of live rows after replay.
    pub rows: usize,
    /// Problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Returns true if nothing was found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks the journal in `path` without modifying it.
///
/// Frames must decode with valid checksums, every row must fit the model
/// and every relation id must point at a live row.
pub fn verify(path: &Path, registry: Arc<TypeRegistry>) -> CommandResult<VerifyResult> {
    let journal = path.join(JOURNAL_FILE);
    let bytes = std::fs::read(&journal)
        .map_err(|e| format!("cannot read {}: {e}", journal.display()))?;

    let mut result = VerifyResult::default();
    let replay = match decode_frames(&bytes) {
        Ok(replay) => replay,
        Err(err) => {
            result.errors.push(err.to_string());
            return Ok(result);
        }
    };
    result.frames = replay.records.len();
    result.torn = replay.torn;
    for record in &replay.records {
        if let JournalRecord::Put(row) = record {
            if registry.model(&row.type_name).is_none() {
                result
                    .errors
                    .push(format!("{}#{}: unknown type", row.type_name, row.id));
            }
        }
    }

    let store = StoreController::with_journal(
        Box::new(MemoryJournal::with_data(bytes)),
        Arc::clone(&registry),
        StoreConfig::default(),
    )?;
    let rows = store.export()?;
    result.rows = rows.len();

    let live: HashSet<(&str, EntityId)> = rows
        .iter()
        .map(|row| (row.type_name.as_str(), row.id))
        .collect();
    for row in &rows {
        let label = format!("{}#{}", row.type_name, row.id);
        if let Err(err) = store.context().materialize(row) {
            result.errors.push(format!("{label}: {err}"));
            continue;
        }
        let Some(model) = registry.model(&row.type_name) else {
            continue;
        };
        for (relation, id) in row.references() {
            let Some(field) = model.relations().iter().find(|r| r.name == relation) else {
                continue;
            };
            if !live.contains(&(field.target.as_str(), id)) {
                result
                    .errors
                    .push(format!("{label}: {relation} points at missing {}#{id}", field.target));
            }
        }
    }
    Ok(result)
}

/// Runs the verify command.
pub fn run(path: &Path, registry: Arc<TypeRegistry>) -> CommandResult<()> {
    println!("Verifying store at {:?}", path);
    println!();

    let result = verify(path, registry)?;
    println!("  Frames: {}", result.frames);
    println!("  Rows:   {}", result.rows);
    if result.torn {
        println!("  Torn tail: yes (dropped on next open)");
    }
    for error in &result.errors {
        println!("  ERROR: {error}");
    }
    println!();

    if result.is_ok() {
        println!("Store verification PASSED");
        Ok(())
    } else {
        Err(format!("store verification FAILED with {} errors", result.errors.len()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entilink_core::TransferObject;
    use entilink_store::encode_frame;
    use entilink_testkit::prelude::*;

    fn write_journal(records: &[JournalRecord]) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let mut bytes = Vec::new();
        for record in records {
            bytes.extend(encode_frame(record).unwrap());
        }
        std::fs::write(dir.path().join(JOURNAL_FILE), bytes).unwrap();
        dir
    }

    #[test]
    fn healthy_store_passes() {
        let store = TestStore::file();
        scenarios::author_with_books(&store.pipeline(), "Eliot", 2);
        let path = store.path().unwrap();
        let result = verify(&path, library()).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(result.rows, 3);
        assert!(!result.torn);
    }

    #[test]
    fn dangling_references_are_reported() {
        let dir = write_journal(&[JournalRecord::Put(
            book_row(0, "Romola").with_one("author", EntityId::new(9)),
        )]);
        let result = verify(dir.path(), library()).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Author#9"));
    }

    #[test]
    fn damaged_frames_are_reported() {
        let dir = write_journal(&[
            JournalRecord::Put(tag_row(0, "a")),
            JournalRecord::Put(tag_row(1, "b")),
        ]);
        let file = dir.path().join(JOURNAL_FILE);
        let mut bytes = std::fs::read(&file).unwrap();
        bytes[10] ^= 0xFF;
        std::fs::write(&file, bytes).unwrap();

        let result = verify(dir.path(), library()).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.rows, 0);
    }

    #[test]
    fn rows_that_do_not_fit_the_model_are_reported() {
        let dir = write_journal(&[
            JournalRecord::Put(tag_row(0, "a").with_field("colour", serde_json::json!("red"))),
            JournalRecord::Put(TransferObject::new("Shelf", EntityId::new(0))),
        ]);
        let result = verify(dir.path(), library()).unwrap();
        assert_eq!(result.errors.len(), 2);
    }
}
