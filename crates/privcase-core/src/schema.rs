//! Column/type contracts for warehouse rows
//!
//! Schemas are small JSON documents mapping column names to type tags. Rows
//! are validated before they cross a warehouse boundary; a violation is
//! fatal and raised immediately, with no partial processing.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// A column/type contract for one warehouse table.
///
/// Column order is meaningful: it is the table's output column order.
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    columns: serde_json::Map<String, Value>,
}

impl Schema {
    fn parse(name: &'static str, raw: &str) -> Self {
        let columns: serde_json::Map<String, Value> =
            serde_json::from_str(raw).unwrap_or_else(|e| panic!("bad embedded schema {name}: {e}"));
        Self { name, columns }
    }

    /// Column names in table order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Validate a batch of rows against this schema.
    ///
    /// Every column must be present in every row; a null value is accepted
    /// only for `*_null` column types.
    pub fn validate_rows(&self, rows: &[Value]) -> Result<()> {
        for (idx, row) in rows.iter().enumerate() {
            self.validate_row(row)
                .map_err(|e| Error::schema(format!("{} row {idx}: {e}", self.name)))?;
        }
        debug!(schema = self.name, rows = rows.len(), "schema validated");
        Ok(())
    }

    fn validate_row(&self, row: &Value) -> std::result::Result<(), String> {
        let obj = row.as_object().ok_or_else(|| "row is not an object".to_string())?;

        for (column, ty) in &self.columns {
            let ty = ty.as_str().ok_or_else(|| format!("schema type for '{column}' is not a string"))?;
            let value = obj
                .get(column)
                .ok_or_else(|| format!("missing required column: {column}"))?;

            let (base, nullable) = match ty.strip_suffix("_null") {
                Some(base) => (base, true),
                None => (ty, false),
            };

            if value.is_null() {
                if nullable {
                    continue;
                }
                return Err(format!("column '{column}' is null"));
            }

            if !type_matches(base, value) {
                return Err(format!("column '{column}' is not {base}"));
            }
        }

        Ok(())
    }
}

fn type_matches(base: &str, value: &Value) -> bool {
    match base {
        "string" => value.is_string(),
        "float" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "timestamp" => value
            .as_str()
            .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
        "date" => value
            .as_str()
            .map(|s| s.parse::<NaiveDate>().is_ok())
            .unwrap_or(false),
        "float_array" => value
            .as_array()
            .map(|a| a.iter().all(Value::is_number))
            .unwrap_or(false),
        _ => false,
    }
}

/// Schema for raw partition rows loaded from the warehouse
pub fn input_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::parse("input_schema", include_str!("../schemas/input_schema.json")))
}

/// Schema for formatted prediction rows
pub fn output_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::parse("output_schema", include_str!("../schemas/output_schema.json")))
}

/// Schema for monitoring-log rows
pub fn run_log_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::parse(
            "inference_log_schema",
            include_str!("../schemas/inference_log_schema.json"),
        )
    })
}
