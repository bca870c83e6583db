use serde::{Deserialize, Serialize, Serializer};

/// Kind names a schema accepts for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Object,
}

impl ValueKind {
    pub fn label(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Object => "object",
        }
    }
}

/// Dtype inferred for a column when the CSV is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Int64,
    Float64,
    Object,
}

impl Dtype {
    pub fn name(&self) -> &'static str {
        match self {
            Dtype::Int64 => "int64",
            Dtype::Float64 => "float64",
            Dtype::Object => "object",
        }
    }

    /// A column satisfies a kind when the dtype name contains the kind label.
    pub fn satisfies(&self, kind: ValueKind) -> bool {
        self.name().contains(kind.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if !f.is_finite() => serializer.serialize_none(),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub label: String,
    pub dtype: Dtype,
    pub values: Vec<Value>,
}

impl Column {
    /// Builds a column from raw cells, `None` marking a missing cell.
    pub fn infer(label: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let has_missing = cells.iter().any(Option::is_none);
        let all_int = cells
            .iter()
            .flatten()
            .all(|cell| cell.trim().parse::<i64>().is_ok());
        let all_numeric = cells
            .iter()
            .flatten()
            .all(|cell| cell.trim().parse::<f64>().is_ok());

        let (dtype, values) = if all_int && !has_missing {
            let values = cells
                .into_iter()
                .flatten()
                .map(|cell| Value::Int(cell.trim().parse().unwrap_or_default()))
                .collect();
            (Dtype::Int64, values)
        } else if all_numeric {
            let values = cells
                .into_iter()
                .map(|cell| match cell {
                    Some(cell) => Value::Float(cell.trim().parse().unwrap_or(f64::NAN)),
                    None => Value::Null,
                })
                .collect();
            (Dtype::Float64, values)
        } else {
            let values = cells
                .into_iter()
                .map(|cell| cell.map(Value::Text).unwrap_or(Value::Null))
                .collect();
            (Dtype::Object, values)
        };

        Self {
            label: label.into(),
            dtype,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Casts every value to `kind`. On failure the column is left untouched.
    pub fn coerce(&mut self, kind: ValueKind) -> Result<(), String> {
        match kind {
            ValueKind::Int => {
                let values = self
                    .values
                    .iter()
                    .map(to_int)
                    .collect::<Result<Vec<_>, _>>()?;
                self.values = values;
                self.dtype = Dtype::Int64;
            }
            ValueKind::Float => {
                let values = self
                    .values
                    .iter()
                    .map(to_float)
                    .collect::<Result<Vec<_>, _>>()?;
                self.values = values;
                self.dtype = Dtype::Float64;
            }
            // Values keep their representation; only the dtype changes.
            ValueKind::Object => self.dtype = Dtype::Object,
        }
        Ok(())
    }
}

fn to_int(value: &Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() => {
            let truncated = f.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(format!("Python int too large to convert to C long: {f}"));
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Null | Value::Float(_) => {
            Err("Cannot convert non-finite values (NA or inf) to integer".to_string())
        }
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("invalid literal for int() with base 10: '{s}'")),
    }
}

fn to_float(value: &Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Null => Ok(Value::Null),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("could not convert string to float: '{s}'")),
    }
}

/// In-memory tabular buffer. Columns are addressed by position until renamed.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// All columns must have the same length.
    pub fn new(columns: Vec<Column>) -> Self {
        debug_assert!(columns.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// First `limit` rows as JSON objects keyed by column label.
    pub fn head(&self, limit: usize) -> Vec<serde_json::Value> {
        (0..self.height().min(limit))
            .map(|row| {
                let record: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .map(|c| {
                        let value = serde_json::to_value(&c.values[row])
                            .unwrap_or(serde_json::Value::Null);
                        (c.label.clone(), value)
                    })
                    .collect();
                serde_json::Value::Object(record)
            })
            .collect()
    }
}

/// Body the ingestion API answers each batch with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub status: String,
    pub message: String,
}

impl SubmissionResponse {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// Outcome of submitting every batch of an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    pub message: String,
    pub batches_submitted: usize,
    pub batches_total: usize,
}
