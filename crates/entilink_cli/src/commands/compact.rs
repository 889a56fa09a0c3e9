//! Compact command implementation.

use super::{open_store, CommandResult};
use entilink_core::{ModelController, TypeRegistry};
use std::path::Path;
use std::sync::Arc;

/// Runs the compact command.
pub fn run(path: &Path, registry: Arc<TypeRegistry>, dry_run: bool) -> CommandResult<()> {
    let store = open_store(path, registry)?;

    if dry_run {
        let stats = store.stats()?;
        let rows: usize = stats.rows.iter().map(|(_, n)| n).sum();
        println!("Dry run - no changes will be made");
        println!();
        println!("Journal: {} bytes", stats.journal_bytes);
        println!("Would rewrite the journal with {rows} live rows");
        return Ok(());
    }

    let stats = store.compact()?;
    store.close()?;
    println!("Compacted store at {:?}", path);
    println!("  Rows:   {}", stats.rows);
    println!("  Before: {} bytes", stats.before);
    println!("  After:  {} bytes", stats.after);
    if stats.before > 0 {
        let saved = stats.before.saturating_sub(stats.after);
        println!("  Saved:  {} bytes ({:.1}%)", saved, saved as f64 * 100.0 / stats.before as f64);
    }
    Ok(())
}
