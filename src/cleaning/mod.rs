
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::table::{ColumnType, Table, Value};

/// Normalize an uploaded table: drop exact-duplicate rows, then fill
/// missing cells per column (median for numeric columns, mode for
/// categorical ones). The input table is left untouched.
///
/// A column with no non-missing values has nothing to impute from; its
/// cells stay missing rather than being guessed.
#[inline]
pub fn clean(table: &Table) -> Table {
    let deduplicated = deduplicate_rows(table);
    let filled = fill_missing(&deduplicated);

    debug!(
        "Cleaned table: {} rows in, {} rows out",
        table.row_count(),
        filled.row_count()
    );
    filled
}

/// Remove rows that structurally equal an earlier row. The first
/// occurrence survives and relative order is preserved.
fn deduplicate_rows(table: &Table) -> Table {
    let mut seen = HashSet::new();
    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .filter(|row| {
            let key: Vec<_> = row.iter().map(Value::equality_key).collect();
            seen.insert(key)
        })
        .cloned()
        .collect();

    Table::from_parts(table.columns().to_vec(), rows)
}

fn fill_missing(table: &Table) -> Table {
    let fills: Vec<Option<Value>> = (0..table.columns().len())
        .map(|i| {
            let column = table.column_at(i)?;
            match column.column_type() {
                ColumnType::Numeric => {
                    let values: Vec<f64> =
                        column.non_missing().filter_map(Value::as_number).collect();
                    median(&values).map(Value::Number)
                }
                ColumnType::Categorical => mode(column.non_missing()),
            }
        })
        .collect();

    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&fills)
                .map(|(cell, fill)| match (cell, fill) {
                    (Value::Missing, Some(fill)) => fill.clone(),
                    _ => cell.clone(),
                })
                .collect()
        })
        .collect();

    Table::from_parts(table.columns().to_vec(), rows)
}

/// Median of a set of numbers; the mean of the two middle values when the
/// count is even. `None` for an empty set.
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some(f64::midpoint(sorted[mid - 1], sorted[mid]))
    }
}

/// Most frequent value. Ties break toward the value whose first occurrence
/// appears earliest in the column, so repeated runs give the same answer.
fn mode<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<_, (usize, usize, &Value)> = HashMap::new();

    for (position, value) in values.enumerate() {
        counts
            .entry(value.equality_key())
            .and_modify(|(count, _, _)| *count += 1)
            .or_insert((1, position, value));
    }

    counts
        .into_values()
        .max_by(|(count_a, first_a, _), (count_b, first_b, _)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(_, _, value)| value.clone())
}
