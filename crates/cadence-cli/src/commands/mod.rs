//! CLI command implementations

pub mod check;
pub mod order;
pub mod simulate;

use anyhow::{Context, Result};
use cadence_order::{DeclarationTable, ExecutionOrder, OrderAssigner};
use std::path::Path;

/// Load declarations from `path` and resolve every type in them
pub(crate) fn resolve(path: &str) -> Result<(OrderAssigner, ExecutionOrder)> {
    if !Path::new(path).exists() {
        anyhow::bail!("Declaration path not found: {}", path);
    }

    let table = DeclarationTable::load_path(path)
        .with_context(|| format!("Failed to load declarations from {}", path))?;
    let mut assigner = OrderAssigner::from_table(&table);
    let order = assigner.resolve_all();
    Ok((assigner, order))
}
