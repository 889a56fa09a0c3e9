//! Inspect command implementation.

use super::{open_store, CommandResult};
use entilink_core::TypeRegistry;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Number of live rows.
    pub total_rows: usize,
    /// Row counts per type, in declaration order.
    pub types: Vec<TypeStats>,
}

/// Statistics for a single type.
#[derive(Debug, Serialize)]
pub struct TypeStats {
    /// Canonical type name.
    pub name: String,
    /// Whether rows carry version tokens.
    pub versioned: bool,
    /// Number of live rows.
    pub rows: usize,
}

/// Collects the inspection result.
pub fn inspect(path: &Path, registry: Arc<TypeRegistry>) -> CommandResult<InspectResult> {
    let store = open_store(path, Arc::clone(&registry))?;
    let stats = store.stats()?;
    let types: Vec<TypeStats> = stats
        .rows
        .into_iter()
        .map(|(name, rows)| TypeStats {
            versioned: registry.model(&name).is_some_and(|m| m.is_versioned()),
            name,
            rows,
        })
        .collect();
    Ok(InspectResult {
        path: path.display().to_string(),
        journal_bytes: stats.journal_bytes,
        total_rows: types.iter().map(|t| t.rows).sum(),
        types,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, registry: Arc<TypeRegistry>, format: &str) -> CommandResult<()> {
    let result = inspect(path, registry)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("Journal: {} bytes", result.journal_bytes);
    println!("Rows: {}", result.total_rows);
    println!();
    println!("{:<24} {:>10} {:>10}", "Type", "Rows", "Versioned");
    for t in &result.types {
        println!(
            "{:<24} {:>10} {:>10}",
            t.name,
            t.rows,
            if t.versioned { "yes" } else { "no" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entilink_testkit::prelude::*;

    #[test]
    fn counts_rows_per_type() {
        let store = TestStore::file();
        scenarios::author_with_books(&store.pipeline(), "Eliot", 3);
        let path = store.path().unwrap();
        let registry = Arc::clone(&store.registry);
        let _dir = store.into_dir();

        let result = inspect(&path, registry).unwrap();
        assert_eq!(result.total_rows, 4);
        let book = result.types.iter().find(|t| t.name == "Book").unwrap();
        assert_eq!(book.rows, 3);
        assert!(book.versioned);
        assert!(result.journal_bytes > 0);
    }
}
