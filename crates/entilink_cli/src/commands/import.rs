//! Import command implementation.

use super::CommandResult;
use entilink_core::{ModelController, TransferObject, TypeRegistry};
use entilink_store::{StoreConfig, StoreController};
use std::path::Path;
use std::sync::Arc;

/// Loads transfer objects from `input` into the store in `path`.
///
/// The store directory is created if missing. Returns the number of rows
/// written.
pub fn import(path: &Path, registry: Arc<TypeRegistry>, input: &Path) -> CommandResult<usize> {
    let json = std::fs::read_to_string(input)
        .map_err(|e| format!("cannot read {}: {e}", input.display()))?;
    let rows: Vec<TransferObject> = serde_json::from_str(&json)?;

    let store = StoreController::open(path, registry, StoreConfig::default())?;
    let written = store.import(&rows)?;
    store.close()?;
    Ok(written)
}

/// Runs the import command.
pub fn run(path: &Path, registry: Arc<TypeRegistry>, input: &Path) -> CommandResult<()> {
    let written = import(path, registry, input)?;
    println!("Imported {written} rows into {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{export, inspect};
    use entilink_testkit::prelude::*;

    #[test]
    fn export_then_import_into_a_new_directory() {
        let store = TestStore::file();
        scenarios::author_with_books(&store.pipeline(), "Austen", 2);
        let rows = store.export().unwrap();
        let source = store.into_dir();

        let out = tempfile::TempDir::new().unwrap();
        let file = out.path().join("rows.json");
        export::run(source.path(), library(), Some(file.as_path())).unwrap();

        let target = out.path().join("copy");
        assert_eq!(import(&target, library(), &file).unwrap(), rows.len());

        let result = inspect::inspect(&target, library()).unwrap();
        assert_eq!(result.total_rows, 3);
    }

    #[test]
    fn malformed_input_fails() {
        let out = tempfile::TempDir::new().unwrap();
        let file = out.path().join("rows.json");
        std::fs::write(&file, "{not json").unwrap();
        assert!(import(&out.path().join("store"), library(), &file).is_err());
    }
}
