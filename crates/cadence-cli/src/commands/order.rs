//! Execution order listing command

use super::resolve;
use anyhow::Result;
use cadence_core::ConfigurationError;
use cadence_order::ExecutionOrder;
use serde::Serialize;

#[derive(Serialize)]
struct RankRow<'a> {
    #[serde(rename = "type")]
    type_name: &'a str,
    rank: u32,
    depends_on: Vec<&'a str>,
}

pub fn run(path: &str, format: &str) -> Result<()> {
    let (assigner, order) = resolve(path)?;

    let rows: Vec<RankRow<'_>> = order
        .sorted()
        .into_iter()
        .map(|(type_name, rank)| RankRow {
            type_name,
            rank: rank.value(),
            depends_on: assigner.dependencies_of(type_name),
        })
        .collect();

    if format == "json" {
        print_json(&rows, assigner.errors())?;
    } else {
        print_text(&order, &rows, assigner.errors());
    }

    if assigner.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_text(order: &ExecutionOrder, rows: &[RankRow<'_>], errors: &[ConfigurationError]) {
    if order.is_empty() {
        println!("No participant types declared.");
    }

    let width = rows.iter().map(|r| r.type_name.len()).max().unwrap_or(0);
    for row in rows {
        if row.depends_on.is_empty() {
            println!("  {:>3}  {}", row.rank, row.type_name);
        } else {
            println!(
                "  {:>3}  {:<width$}  after {}",
                row.rank,
                row.type_name,
                row.depends_on.join(", "),
                width = width
            );
        }
    }

    if !errors.is_empty() {
        eprintln!();
        eprintln!("{} configuration error(s):", errors.len());
        for error in errors {
            eprintln!("  [ERROR] {}", error);
        }
    }
}

fn print_json(rows: &[RankRow<'_>], errors: &[ConfigurationError]) -> Result<()> {
    let errors: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    let output = serde_json::json!({
        "valid": errors.is_empty(),
        "order": rows,
        "errors": errors,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
