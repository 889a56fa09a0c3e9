//! CLI command implementations.

pub mod compact;
pub mod export;
pub mod import;
pub mod inspect;
pub mod verify;

use entilink_core::TypeRegistry;
use entilink_store::{StoreConfig, StoreController};
use std::path::Path;
use std::sync::Arc;

/// Result type of every command.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Reads and validates a JSON model description.
pub fn load_registry(path: &Path) -> CommandResult<Arc<TypeRegistry>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read model {}: {e}", path.display()))?;
    Ok(Arc::new(TypeRegistry::from_json(&json)?))
}

/// Opens an existing store directory.
pub fn open_store(path: &Path, registry: Arc<TypeRegistry>) -> CommandResult<Arc<StoreController>> {
    let config = StoreConfig::new().create_if_missing(false);
    Ok(StoreController::open(path, registry, config)?)
}
