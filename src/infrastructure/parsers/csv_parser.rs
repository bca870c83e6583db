use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::{debug, info, error};
use crate::domain::{
    error::IngestionError,
    models::{Column, Table},
    ports::DataParser,
};

/// Cell contents read as a missing value.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub struct CsvParser;

impl DataParser for CsvParser {
    fn parse(&self, file_bytes: &[u8]) -> Result<Table, IngestionError> {
        parse_csv(file_bytes)
    }
}

/// Reads a headerless CSV; the first row is data and fixes the column count.
pub fn parse_csv(bytes: &[u8]) -> Result<Table, IngestionError> {
    debug!("Creating CSV reader with headers disabled");
    let cursor = Cursor::new(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(cursor);

    let mut cells: Vec<Vec<Option<String>>> = Vec::new();
    let mut row_count = 0;

    for record in reader.records() {
        let record = record.map_err(|e| {
            error!("Failed to read CSV record at row {}: {}", row_count + 1, e);
            IngestionError::Parse(e.to_string())
        })?;

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        if cells.is_empty() {
            cells = vec![Vec::new(); record.len()];
            info!("Found {} columns in CSV", record.len());
        } else if record.len() > cells.len() {
            error!("Row {} has {} fields, expected {}", row_count + 1, record.len(), cells.len());
            return Err(IngestionError::Parse(format!(
                "Error tokenizing data. Expected {} fields in line {}, saw {}",
                cells.len(),
                row_count + 1,
                record.len()
            )));
        }

        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record
                .get(i)
                .filter(|field| !NA_MARKERS.contains(field))
                .map(str::to_string);
            column.push(cell);
        }

        row_count += 1;
        if row_count % 1000 == 0 {
            debug!("Processed {} CSV rows", row_count);
        }
    }

    if row_count == 0 {
        error!("CSV file has no data rows");
        return Err(IngestionError::EmptyFile);
    }

    info!("Parsed {} rows from CSV", row_count);
    let columns = cells
        .into_iter()
        .enumerate()
        .map(|(i, column)| Column::infer(i.to_string(), column))
        .collect();
    Ok(Table::new(columns))
}
