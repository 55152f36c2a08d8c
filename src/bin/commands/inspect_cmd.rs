use anyhow::Result;
use geobin::{Database, Family};
use serde_json::json;

use super::OpenOptions;
use crate::cli_utils::{format_bytes, format_number};

pub fn cmd_inspect(options: OpenOptions, json_output: bool) -> Result<()> {
    let db = options.open()?;
    let meta = db.metadata();
    let columns: Vec<&str> = db.layout().columns().map(|c| c.name()).collect();

    if json_output {
        let output = json!({
            "file": options.path().display().to_string(),
            "release_date": meta.release_date(),
            "legacy": meta.is_legacy(),
            "ipv4_indexed": !db.index(Family::V4).is_empty(),
            "ipv6_indexed": !db.index(Family::V6).is_empty(),
            "columns": columns,
            "metadata": meta,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Database: {}", options.path().display());
    println!(
        "Schema:   DB{} ({} columns)",
        meta.schema_type, meta.column_count
    );
    println!("Released: {}", meta.release_date());
    println!(
        "Product:  code {}, type {}{}",
        meta.product_code,
        meta.product_type,
        if meta.is_legacy() { " (legacy)" } else { "" }
    );
    if meta.file_size > 0 {
        println!("Size:     {}", format_bytes(meta.file_size as usize));
    }
    println!();

    println!("Ranges:");
    print_family(&db, Family::V4);
    print_family(&db, Family::V6);
    println!();

    println!("Columns:");
    for name in columns {
        println!("  {}", name);
    }

    Ok(())
}

fn print_family(db: &Database, family: Family) {
    let count = db.metadata().row_count(family);
    let indexed = !db.index(family).is_empty();
    if count == 0 {
        println!("  {}: none", family);
    } else {
        println!(
            "  {}: {} rows, {}",
            family,
            format_number(count as usize),
            if indexed { "indexed" } else { "not indexed" }
        );
    }
}
