use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// Submission keys in the order their values are written to a row, after the timestamp.
pub const FIELD_ORDER: [&str; 20] = [
    "name",
    "email",
    "business_name",
    "industry",
    "employees",
    "what_sell",
    "typical_customer",
    "source",
    "top_tasks",
    "magic_wand",
    "leads_challenge",
    "sales_team",
    "closing_issues",
    "delivery_time",
    "ops_recurring",
    "support_headaches",
    "ai_experience",
    "which_ai_tools",
    "success_definition",
    "specific_focus",
];

/// Column titles for row 1, positionally aligned with `FIELD_ORDER`.
pub const HEADER_TITLES: [&str; ROW_WIDTH] = [
    "Timestamp",
    "Name",
    "Email",
    "Business Name",
    "Industry",
    "Employees",
    "What You Sell",
    "Typical Customer",
    "Traffic Source",
    "Top 3 Tasks",
    "Magic Wand Task",
    "Leads Challenge",
    "Sales Team",
    "Closing Issues",
    "Delivery Time",
    "Recurring Ops Issues",
    "Support Headaches",
    "AI Experience",
    "Which AI Tools",
    "Success Definition",
    "Specific Focus",
];

pub const ROW_WIDTH: usize = FIELD_ORDER.len() + 1;

pub const SOURCE_FIELD: &str = "source";
pub const SOURCE_SEPARATOR: &str = ", ";

pub fn header_cells() -> Vec<String> {
    HEADER_TITLES.iter().map(|title| title.to_string()).collect()
}

/// One decoded form payload. Unknown keys are kept but never written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    fields: Map<String, Value>,
}

impl Submission {
    pub fn parse(raw: &[u8]) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_slice(raw)?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(IngestError::parse(format!(
                "submission must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Collapses a multi-select `source` into a single comma-and-space joined string.
    pub fn normalize_source(&mut self) {
        if let Some(Value::Array(items)) = self.fields.get(SOURCE_FIELD) {
            let joined = items
                .iter()
                .map(display_text)
                .collect::<Vec<_>>()
                .join(SOURCE_SEPARATOR);
            self.fields
                .insert(SOURCE_FIELD.to_string(), Value::String(joined));
        }
    }

    pub fn to_row(&self, timestamp: DateTime<Utc>) -> Row {
        let values = FIELD_ORDER
            .iter()
            .map(|key| self.fields.get(*key).map(cell_text).unwrap_or_default())
            .collect();
        Row::new(timestamp, values)
    }
}

/// A data row: the timestamp cell followed by one cell per entry of `FIELD_ORDER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    fn new(timestamp: DateTime<Utc>, values: Vec<String>) -> Self {
        debug_assert_eq!(values.len(), FIELD_ORDER.len());
        let mut cells = Vec::with_capacity(ROW_WIDTH);
        cells.push(format_timestamp(timestamp));
        cells.extend(values);
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        let index = FIELD_ORDER.iter().position(|key| *key == field)?;
        self.cells.get(index + 1).map(String::as_str)
    }

    pub fn into_cells(self) -> Vec<String> {
        self.cells
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Falsy values (null, false, 0, "") land in the sheet as an empty cell.
fn cell_text(value: &Value) -> String {
    let falsy = match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    if falsy {
        String::new()
    } else {
        display_text(value)
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(display_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
