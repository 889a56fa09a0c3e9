//! Export command implementation.

use super::{open_store, CommandResult};
use entilink_core::{ModelController, TypeRegistry};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Runs the export command, writing a JSON array of transfer objects.
pub fn run(path: &Path, registry: Arc<TypeRegistry>, output: Option<&Path>) -> CommandResult<()> {
    let store = open_store(path, registry)?;
    let rows = store.export()?;
    store.close()?;

    let json = serde_json::to_string_pretty(&rows)?;
    match output {
        Some(file) => {
            std::fs::write(file, json)?;
            eprintln!("Exported {} rows to {:?}", rows.len(), file);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}
