
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt::Write;

use crate::index::ScoredChunk;
use crate::table::{Table, Value, format_number};

/// Marker rendered into the summary when an expected column is absent.
/// Summary computation degrades to this, never to an error.
pub const NOT_FOUND: &str = "not found";

/// Column names probed for the group-wise aggregate, in priority order.
const GROUP_COLUMN_CANDIDATES: &[&str] = &["store", "group"];

/// Column names probed for the numeric range aggregate, in priority order.
const VALUE_COLUMN_CANDIDATES: &[&str] = &["price", "value"];

/// Compact description of the cleaned dataset, included in every grounded
/// prompt so the model knows the shape of what it is reasoning over.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub columns: Vec<String>,
    /// Matched group column name and its distinct values in first-seen
    /// order, when such a column exists.
    pub groups: Option<(String, Vec<String>)>,
    /// Matched value column name and its (min, max) over non-missing
    /// numbers, when such a column exists and holds at least one number.
    pub value_range: Option<(String, f64, f64)>,
}

impl DatasetSummary {
    #[inline]
    pub fn compute(table: &Table) -> Self {
        Self {
            row_count: table.row_count(),
            columns: table.columns().to_vec(),
            groups: find_group_values(table),
            value_range: find_value_range(table),
        }
    }

    #[inline]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "- Rows: {}", self.row_count);
        let _ = writeln!(out, "- Columns: {}", self.columns.join(", "));

        match &self.groups {
            Some((column, values)) => {
                let _ = writeln!(
                    out,
                    "- Distinct values of '{}': {}",
                    column,
                    values.join(", ")
                );
            }
            None => {
                let _ = writeln!(out, "- Store/group column: {}", NOT_FOUND);
            }
        }

        match &self.value_range {
            Some((column, min, max)) => {
                let _ = writeln!(
                    out,
                    "- '{}' range: min {}, max {}",
                    column,
                    format_number(*min),
                    format_number(*max)
                );
            }
            None => {
                let _ = writeln!(out, "- Price/value column: {}", NOT_FOUND);
            }
        }

        out
    }
}

fn find_group_values(table: &Table) -> Option<(String, Vec<String>)> {
    let column = GROUP_COLUMN_CANDIDATES
        .iter()
        .find_map(|name| table.column(name))?;

    let mut seen = HashSet::new();
    let values: Vec<String> = column
        .non_missing()
        .map(|v| v.to_string())
        .filter(|v| seen.insert(v.clone()))
        .collect();

    Some((column.name().to_string(), values))
}

fn find_value_range(table: &Table) -> Option<(String, f64, f64)> {
    let column = VALUE_COLUMN_CANDIDATES
        .iter()
        .find_map(|name| table.column(name))?;

    let numbers: Vec<f64> = column.non_missing().filter_map(Value::as_number).collect();
    let (min, max) = numbers
        .iter()
        .copied()
        .minmax_by(f64::total_cmp)
        .into_option()?;

    Some((column.name().to_string(), min, max))
}

/// Compose the grounded prompt: role framing, dataset summary, the
/// verbatim question, retrieved context in ranked order, and explicit
/// answer-format instructions. Pure string composition; what this tells
/// the model to do is part of the pipeline's contract.
#[inline]
pub fn assemble_prompt(table: &Table, question: &str, retrieved: &[ScoredChunk]) -> String {
    let summary = DatasetSummary::compute(table);

    let context = retrieved
        .iter()
        .map(|scored| scored.chunk.content.as_str())
        .join("\n");

    format!(
        "You are an expert data analyst answering questions about an uploaded dataset.\n\
         \n\
         Dataset summary:\n\
         {summary}\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Relevant data (most relevant first):\n\
         {context}\n\
         \n\
         Instructions:\n\
         - Answer using only the dataset summary and the relevant data above.\n\
         - If the question asks for a result per group (for example per store), \
         give one answer for every distinct group value, not just a single overall result.\n\
         - Name the columns and values your answer is based on.\n\
         - If the data does not contain the answer, say so explicitly instead of guessing.\n",
        summary = summary.render(),
        question = question,
        context = context,
    )
}
