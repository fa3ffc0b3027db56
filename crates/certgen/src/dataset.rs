//! Tabular datasets from spreadsheets or JSON

use crate::{CertError, Result};
use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use chrono::Timelike;
use std::collections::HashMap;
use std::path::Path;

/// One dataset row
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    /// Zero-based row index (header excluded)
    pub index: usize,
    values: HashMap<String, String>,
}

impl DataRecord {
    pub fn new(index: usize, values: HashMap<String, String>) -> Self {
        Self { index, values }
    }

    /// Text value of a column, if present
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Ordered columns plus rows
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<DataRecord>,
}

impl Dataset {
    /// Build a dataset from column names and row values
    ///
    /// Each row is matched to `columns` by position; missing trailing cells
    /// are absent in the record.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let values = columns.iter().cloned().zip(row).collect();
                DataRecord::new(index, values)
            })
            .collect();

        Self { columns, records }
    }

    /// Load by file extension: `.json`, or any spreadsheet calamine reads
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let dataset = if is_json {
            let json = std::fs::read_to_string(path)
                .map_err(|e| CertError::DataRead(format!("{}: {e}", path.display())))?;
            Self::from_json_str(&json)?
        } else {
            Self::from_spreadsheet(path)?
        };

        log::info!(
            "Loaded {} records with columns {:?} from {}",
            dataset.len(),
            dataset.columns,
            path.display()
        );

        Ok(dataset)
    }

    /// Read the first worksheet; the first row is the header
    pub fn from_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| CertError::DataRead(format!("{}: {e}", path.display())))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| CertError::DataRead(format!("{}: no worksheets", path.display())))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| CertError::DataRead(format!("{}: {e}", path.display())))?;

        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range.rows();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| cell_to_string(cell).trim().to_string())
                .collect(),
            None => return Self::default(),
        };

        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Self::from_rows(columns, rows)
    }

    /// Parse a JSON array of flat objects
    ///
    /// Columns are the union of keys across all rows.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| CertError::DataRead(e.to_string()))?;

        let items = value
            .as_array()
            .ok_or_else(|| CertError::DataRead("expected a JSON array of objects".to_string()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or_else(|| {
                CertError::DataRead(format!("row {index} is not a JSON object"))
            })?;

            let mut values = HashMap::new();
            for (key, value) in object {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
                values.insert(key.clone(), value_to_string(value));
            }
            records.push(DataRecord::new(index, values));
        }

        Ok(Self { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.as_str() == column)
    }

    pub fn records(&self) -> &[DataRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Render a spreadsheet cell as text
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_datetime_to_string(dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Dates as `YYYY-MM-DD`, with the time only when it is not midnight
fn excel_datetime_to_string(dt: &ExcelDateTime) -> String {
    match dt.as_datetime() {
        Some(datetime) if datetime.num_seconds_from_midnight() == 0 => {
            datetime.format("%Y-%m-%d").to_string()
        }
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => dt.to_string(),
    }
}

/// Convert a JSON value to text
fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 => format!("{:.0}", f),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_rows() {
        let dataset = Dataset::from_rows(
            vec!["Name".to_string(), "Course".to_string()],
            vec![
                vec!["Ana Maria".to_string(), "Rust".to_string()],
                vec!["Bob".to_string()],
            ],
        );

        assert_eq!(dataset.len(), 2);
        assert!(dataset.has_column("Course"));
        assert_eq!(dataset.records()[0].get("Course"), Some("Rust"));
        assert_eq!(dataset.records()[1].get("Course"), None);
        assert_eq!(dataset.records()[1].index, 1);
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"[
            { "Name": "Ana Maria", "Score": 97.0, "Id": 7 },
            { "Name": null, "Score": 88.5, "Extra": true }
        ]"#;

        let dataset = Dataset::from_json_str(json).unwrap();

        assert_eq!(dataset.columns().len(), 4);
        assert!(dataset.has_column("Extra"));
        let first = &dataset.records()[0];
        assert_eq!(first.get("Score"), Some("97"));
        assert_eq!(first.get("Id"), Some("7"));
        let second = &dataset.records()[1];
        assert_eq!(second.get("Name"), Some(""));
        assert_eq!(second.get("Score"), Some("88.5"));
        assert_eq!(second.get("Extra"), Some("true"));
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        assert!(matches!(
            Dataset::from_json_str(r#"{ "Name": "x" }"#),
            Err(CertError::DataRead(_))
        ));
        assert!(matches!(
            Dataset::from_json_str("[1, 2]"),
            Err(CertError::DataRead(_))
        ));
        assert!(matches!(
            Dataset::from_json_str("not json"),
            Err(CertError::DataRead(_))
        ));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(2024.0)), "2024");
        assert_eq!(cell_to_string(&Data::Float(3.25)), "3.25");
        assert_eq!(cell_to_string(&Data::Int(12)), "12");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("Ana".to_string())), "Ana");
    }

    #[test]
    fn test_excel_dates_render_as_calendar_dates() {
        let date = ExcelDateTime::new(45292.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_to_string(&Data::DateTime(date)), "2024-01-01");

        let noon = ExcelDateTime::new(45292.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_to_string(&Data::DateTime(noon)), "2024-01-01 12:00:00");
    }

    #[test]
    fn test_missing_spreadsheet_is_data_read_error() {
        assert!(matches!(
            Dataset::load("/nonexistent/attendees.xlsx"),
            Err(CertError::DataRead(_))
        ));
    }
}
