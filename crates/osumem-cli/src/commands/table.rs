//! Table command: print the built-in offset table or validate a table file.

use std::path::Path;

use anyhow::{Context, Result};
use osumem_core::offset::{OffsetTable, stable_table};
use osumem_core::{load_table, save_table};

/// Run the table command
pub fn run(check: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let table = match check {
        Some(path) => {
            let table = load_table(path)
                .with_context(|| format!("Invalid offset table {}", path.display()))?;
            print_summary(&table);
            table
        }
        None => stable_table(),
    };

    match output {
        Some(path) => {
            save_table(path, &table)?;
            println!("Table '{}' written to {}", table.family, path.display());
        }
        None if check.is_none() => println!("{}", serde_json::to_string_pretty(&table)?),
        None => {}
    }
    Ok(())
}

fn print_summary(table: &OffsetTable) {
    let unsupported = table
        .fields
        .values()
        .filter(|f| !f.is_supported())
        .count();
    println!(
        "Table '{}' is valid ({}-bit, {} anchors, {} fields, {} unsupported)",
        table.family,
        table.pointer_width.bits(),
        table.anchors.len(),
        table.fields.len(),
        unsupported
    );
}
