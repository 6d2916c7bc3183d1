//! SQL emitter for the store tracking tables.
//!
//! Reads the tracking sheets' CSV exports and prints semicolon-terminated
//! `INSERT` statements for `store_details`, `gantt_tasks`, and
//! `gantt_marklines`. Output is text on stdout; nothing executes against
//! a database.

pub mod stores;
pub mod tasks;

use std::path::Path;

use anyhow::Result;

/// Placeholder strings the tracking sheets use for "no value".
const EMPTY_SENTINELS: &[&str] = &["无", "暂无", "N/A", "/"];

/// Normalize a raw cell: trim whitespace, map empty sentinels to `None`.
pub fn clean_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || EMPTY_SENTINELS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Escape a value into a single-quoted SQL string literal.
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Split one CSV line, honoring double-quoted fields.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Emit all three tables to stdout.
pub fn emit_all(stores_path: &Path, tasks_path: Option<&Path>) -> Result<()> {
    let store_rows = stores::load_stores(stores_path)?;

    println!("-- store_details INSERT statements --");
    for statement in stores::store_details_sql(&store_rows) {
        println!("{statement}");
    }

    if let Some(tasks_path) = tasks_path {
        let task_rows = tasks::load_tasks(tasks_path)?;
        println!();
        println!("-- gantt_tasks INSERT statements --");
        for statement in tasks::gantt_tasks_sql(&store_rows, &task_rows) {
            println!("{statement}");
        }
    }

    println!();
    println!("-- gantt_marklines INSERT statements --");
    for statement in tasks::gantt_marklines_sql(&store_rows) {
        println!("{statement}");
    }

    Ok(())
}
