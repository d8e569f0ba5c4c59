
use anyhow::Context;
use calamine::{Data, Reader, open_workbook_auto};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::{AssistantError, Result};

/// A single cell value. Uploaded tables only ever contain scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Key usable for exact structural equality in hash maps. `f64` is not
    /// `Hash`, so numbers are compared by their bit pattern.
    pub(crate) fn equality_key(&self) -> ValueKey {
        match self {
            Value::Number(n) => ValueKey::Number(n.to_bits()),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Missing => ValueKey::Missing,
        }
    }
}

impl fmt::Display for Value {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Number(u64),
    Text(String),
    Missing,
}

/// Render a number without a trailing `.0` so `10.0` round-trips as `10`,
/// matching how integer-valued cells appear in the source files.
#[inline]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Column type classification derived from observed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every non-missing value is a number.
    Numeric,
    /// Anything else, including columns with no non-missing values.
    Categorical,
}

/// An in-memory table: ordered rows of cells under named columns.
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    #[inline]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AssistantError::InputFormat(format!(
                    "Row {} has {} cells but the table has {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Constructor for pipeline stages that already guarantee uniform row
    /// width (cleaning preserves the shape of its input).
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a column by case-insensitive name. Returns `None` when the
    /// column does not exist; callers degrade instead of erroring.
    #[inline]
    pub fn column(&self, name: &str) -> Option<ColumnView<'_>> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))?;
        Some(ColumnView { table: self, index })
    }

    #[inline]
    pub fn column_at(&self, index: usize) -> Option<ColumnView<'_>> {
        (index < self.columns.len()).then_some(ColumnView { table: self, index })
    }

    /// Parse an uploaded file into a table, dispatching on extension.
    /// CSV and Excel (first sheet only) are supported.
    #[inline]
    pub fn from_file(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::from_csv_path(path),
            "xlsx" | "xls" => Self::from_spreadsheet(path),
            other => Err(AssistantError::InputFormat(format!(
                "Unsupported file extension '{}' (expected csv, xlsx, or xls)",
                other
            ))),
        }
    }

    #[inline]
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        Self::from_csv_reader(file)
    }

    /// Parse delimited text. The first record is the header row.
    #[inline]
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()
            .map_err(|e| AssistantError::InputFormat(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                AssistantError::InputFormat(format!("Failed to parse CSV record {}: {}", i + 1, e))
            })?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        debug!("Parsed CSV table: {} columns, {} rows", columns.len(), rows.len());
        Self::new(columns, rows)
    }

    /// Parse the first sheet of an Excel workbook.
    #[inline]
    pub fn from_spreadsheet(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            AssistantError::InputFormat(format!(
                "Failed to open spreadsheet {}: {}",
                path.display(),
                e
            ))
        })?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AssistantError::InputFormat("Workbook has no sheets".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            AssistantError::InputFormat(format!("Failed to read sheet '{}': {}", sheet_name, e))
        })?;

        let mut row_iter = range.rows();
        let header = row_iter
            .next()
            .ok_or_else(|| AssistantError::InputFormat("Sheet is empty".to_string()))?;

        let columns: Vec<String> = header.iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let rows: Vec<Vec<Value>> = row_iter
            .map(|row| {
                let mut cells: Vec<Value> = row.iter().map(convert_sheet_cell).collect();
                // calamine trims trailing empty cells from each row
                cells.resize(width, Value::Missing);
                cells
            })
            .collect();

        debug!(
            "Parsed sheet '{}': {} columns, {} rows",
            sheet_name,
            columns.len(),
            rows.len()
        );
        Self::new(columns, rows)
    }

    /// Serialize as UTF-8 CSV: header row of column names, no index column.
    /// Missing cells become empty fields.
    #[inline]
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(&self.columns)
            .context("Failed to write CSV header")?;

        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writer.write_record(&fields).context("Failed to write CSV row")?;
        }

        let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
        String::from_utf8(bytes)
            .context("CSV output was not valid UTF-8")
            .map_err(Into::into)
    }

    #[inline]
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let contents = self.to_csv()?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        Ok(())
    }
}

/// Borrowed view of one column, with its classification.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> ColumnView<'a> {
    #[inline]
    pub fn name(&self) -> &'a str {
        &self.table.columns[self.index]
    }

    #[inline]
    pub fn values(&self) -> impl Iterator<Item = &'a Value> {
        self.table.rows.iter().map(move |row| &row[self.index])
    }

    #[inline]
    pub fn non_missing(&self) -> impl Iterator<Item = &'a Value> {
        self.values().filter(|v| !v.is_missing())
    }

    #[inline]
    pub fn column_type(&self) -> ColumnType {
        let mut saw_value = false;
        for value in self.non_missing() {
            saw_value = true;
            if !matches!(value, Value::Number(_)) {
                return ColumnType::Categorical;
            }
        }
        if saw_value {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }
}

/// Interpret a CSV field: empty means missing, numeric text becomes a
/// number, everything else stays text.
fn parse_cell(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(field.to_string()),
    }
}

fn convert_sheet_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::Int(v) => Value::Number(*v as f64),
        Data::Float(v) => Value::Number(*v),
        Data::String(v) => {
            if v.trim().is_empty() {
                Value::Missing
            } else {
                Value::Text(v.clone())
            }
        }
        Data::Bool(v) => Value::Text(v.to_string()),
        Data::DateTime(v) => Value::Number(v.as_f64()),
        Data::DateTimeIso(v) | Data::DurationIso(v) => Value::Text(v.clone()),
        Data::Error(_) => Value::Missing,
    }
}
