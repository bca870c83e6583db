use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};
use crate::domain::{
    error::IngestionError,
    models::{Table, Value},
    schema::{self, FileSchema},
};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub fn validate_filename(filename: &str) -> Result<&'static FileSchema, IngestionError> {
    schema::lookup(filename).ok_or_else(|| {
        warn!("Rejected upload with unknown filename: {}", filename);
        IngestionError::InvalidFilename(filename.to_string())
    })
}

pub fn validate_column_count(schema: &FileSchema, table: &Table) -> Result<(), IngestionError> {
    let expected = schema.expected_columns();
    if table.width() != expected {
        warn!("{} has {} columns, expected {}", schema.filename, table.width(), expected);
        return Err(IngestionError::InvalidColumnCount {
            expected,
            found: table.width(),
        });
    }
    Ok(())
}

/// Coerces every column whose dtype matches none of its acceptable kinds
/// to the first acceptable kind declared for that column.
pub fn coerce_dtypes(schema: &FileSchema, table: &mut Table) -> Result<(), IngestionError> {
    for (position, (column, spec)) in table
        .columns_mut()
        .iter_mut()
        .zip(schema.columns)
        .enumerate()
    {
        if spec.kinds.iter().any(|kind| column.dtype.satisfies(*kind)) {
            continue;
        }

        let target = spec.kinds[0];
        debug!(
            "Column {} of {} is {}, coercing to {}",
            position,
            schema.filename,
            column.dtype.name(),
            target.label()
        );
        column.coerce(target).map_err(|details| {
            warn!("Dtype coercion failed for column {} of {}: {}", position, schema.filename, details);
            IngestionError::InvalidDtype {
                filename: schema.filename.to_string(),
                details,
            }
        })?;
    }
    Ok(())
}

pub fn validate_datetime_column(schema: &FileSchema, table: &Table) -> Result<(), IngestionError> {
    let Some(position) = schema.datetime_column else {
        return Ok(());
    };
    let Some(column) = table.columns().get(position) else {
        return Ok(());
    };

    for (row, value) in column.values.iter().enumerate() {
        if !is_datetime(value) {
            warn!("Row {} of {} has invalid datetime value {:?}", row, schema.filename, value);
            return Err(IngestionError::InvalidDatetime);
        }
    }
    Ok(())
}

fn is_datetime(value: &Value) -> bool {
    match value {
        _ if value.is_missing() => true,
        // Numbers are read as epoch timestamps.
        Value::Int(_) => true,
        Value::Float(f) => f.is_finite(),
        Value::Text(s) => parse_datetime(s.trim()),
        Value::Null => true,
    }
}

fn parse_datetime(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
}

pub fn rename_columns(schema: &FileSchema, table: &mut Table) {
    for (column, spec) in table.columns_mut().iter_mut().zip(schema.columns) {
        column.label = spec.name.to_string();
    }
}
