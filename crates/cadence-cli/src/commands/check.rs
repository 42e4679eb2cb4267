//! Declaration check command

use super::resolve;
use anyhow::Result;
use cadence_order::OrderRegistry;

pub fn run(path: &str) -> Result<()> {
    let (assigner, order) = resolve(path)?;

    // Debug builds already ran the diagnostic inside resolve_all.
    let computed;
    let registry = match assigner.rank_diagnostic() {
        Some(registry) => registry,
        None => {
            computed = OrderRegistry::check(&order, assigner.catalog());
            &computed
        }
    };

    println!("Checked {} participant type(s)", order.len());

    for error in assigner.errors() {
        println!("  [ERROR] {}", error);
    }
    if let Some(warning) = registry.first_collision() {
        println!("  [WARN ] {}", warning);
    }

    if assigner.has_errors() {
        println!("\n{} configuration error(s) found.", assigner.errors().len());
        std::process::exit(1);
    }
    if registry.first_collision().is_none() {
        println!("No problems found.");
    }
    Ok(())
}
