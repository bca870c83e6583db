use serde_json::{json, Map, Value as JsonValue};
use crate::domain::models::{Table, Value};

pub const MAX_RECORDS_PER_BATCH: usize = 1000;

/// Contiguous row range `[start, end)` of a table.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    table: &'a Table,
    start: usize,
    end: usize,
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn column(&self, position: usize) -> &'a [Value] {
        &self.table.columns()[position].values[self.start..self.end]
    }

    /// Column-major view: column label to its values, in column order.
    pub fn to_columns(&self) -> Map<String, JsonValue> {
        self.table
            .columns()
            .iter()
            .enumerate()
            .map(|(position, column)| {
                let values = self
                    .column(position)
                    .iter()
                    .map(|v| serde_json::to_value(v).unwrap_or(JsonValue::Null))
                    .collect();
                (column.label.clone(), JsonValue::Array(values))
            })
            .collect()
    }
}

/// Splits `table` into consecutive batches of at most `max_rows` rows.
/// An empty table yields a single empty batch.
pub fn split_batches(table: &Table, max_rows: usize) -> Vec<Batch<'_>> {
    let max_rows = max_rows.max(1);
    let height = table.height();
    if height == 0 {
        return vec![Batch { table, start: 0, end: 0 }];
    }
    (0..height)
        .step_by(max_rows)
        .map(|start| Batch {
            table,
            start,
            end: (start + max_rows).min(height),
        })
        .collect()
}

pub fn build_payload(table_name: &str, batch: &Batch<'_>) -> JsonValue {
    json!({
        "table": {
            table_name: batch.to_columns()
        }
    })
}
