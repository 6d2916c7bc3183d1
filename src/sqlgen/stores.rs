//! `store_details` emission.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::sqlgen::{clean_value, split_csv_line, sql_quote};

/// Source header → database column, in emitted column order.
const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("排序", "sort_order"),
    ("门店名称（区位名称）", "store_name"),
    ("所处区域", "district"),
    ("建筑面积", "building_area"),
    ("套内实际面积", "usable_area"),
    ("租金", "rent"),
    ("免租期", "rent_free_period"),
    ("物业费", "property_fee"),
    ("电费", "electricity_fee"),
    ("水费", "water_fee"),
    ("付款方式", "payment_method"),
    ("租金递增方式", "rent_increase"),
    ("合同年限", "contract_years"),
    ("门店属性", "properties"),
    ("开办杂费", "startup_costs"),
    ("筹开进度", "progress"),
    ("预估回本周期", "roi_period"),
];

const NAME_HEADER: &str = "门店名称（区位名称）";
const SORT_HEADER: &str = "排序";

#[derive(Debug, Clone)]
pub struct StoreRow {
    pub store_id: String,
    pub store_name: String,
    /// (database column, value) pairs for the columns present in the row.
    pub columns: Vec<(&'static str, String)>,
}

/// Identifier derived from the store name: word characters only, lowercased.
pub fn store_id_from_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Parse the store export. Rows without a store name and trailing "PS"
/// annotation rows are skipped.
pub fn parse_stores(contents: &str) -> Vec<StoreRow> {
    let mut lines = contents.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = split_csv_line(header)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let cell = |source: &str| -> Option<String> {
            let index = headers.iter().position(|h| h == source)?;
            clean_value(fields.get(index).map(String::as_str).unwrap_or(""))
        };

        let Some(store_name) = cell(NAME_HEADER) else {
            warn!(line = line_no + 2, "Skipping store row without a name");
            continue;
        };
        if cell(SORT_HEADER).is_some_and(|s| s.contains("PS")) {
            continue;
        }

        let mut columns = Vec::new();
        for (source, db_col) in COLUMN_MAPPING {
            let value = if *db_col == "sort_order" {
                Some(parse_sort_order(cell(source)).to_string())
            } else {
                cell(source)
            };
            if let Some(value) = value {
                columns.push((*db_col, value));
            }
        }

        rows.push(StoreRow {
            store_id: store_id_from_name(&store_name),
            store_name,
            columns,
        });
    }
    rows
}

/// Sort order defaults to 0; spreadsheet exports sometimes render
/// integers as floats.
fn parse_sort_order(value: Option<String>) -> i64 {
    value
        .and_then(|v| {
            v.parse::<i64>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().map(|f| f as i64))
        })
        .unwrap_or(0)
}

pub fn load_stores(path: &Path) -> Result<Vec<StoreRow>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read store export {}", path.display()))?;
    Ok(parse_stores(&contents))
}

/// One INSERT per store; `store_id` is always emitted first, other
/// columns only when the source row carried a value.
pub fn store_details_sql(rows: &[StoreRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let mut columns = vec!["store_id"];
            let mut values = vec![sql_quote(&row.store_id)];
            for (db_col, value) in &row.columns {
                columns.push(db_col);
                values.push(sql_quote(value));
            }
            format!(
                "INSERT INTO store_details ({}) VALUES ({});",
                columns.join(", "),
                values.join(", ")
            )
        })
        .collect()
}
