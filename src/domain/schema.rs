use crate::domain::models::ValueKind;

#[derive(Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    /// Acceptable kinds in order of preference; the first one is the coercion target.
    pub kinds: &'static [ValueKind],
}

#[derive(Debug)]
pub struct FileSchema {
    pub filename: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Position (before rename) of a column that must hold date/time values.
    pub datetime_column: Option<usize>,
}

impl FileSchema {
    pub fn expected_columns(&self) -> usize {
        self.columns.len()
    }

    /// Target table name on the ingestion side: the filename without `.csv`.
    pub fn table_name(&self) -> &'static str {
        self.filename.strip_suffix(".csv").unwrap_or(self.filename)
    }
}

const INT: &[ValueKind] = &[ValueKind::Int];
const OBJECT: &[ValueKind] = &[ValueKind::Object];
const INT_OR_FLOAT: &[ValueKind] = &[ValueKind::Int, ValueKind::Float];

pub const HIRED_EMPLOYEES: FileSchema = FileSchema {
    filename: "hired_employees.csv",
    columns: &[
        ColumnSpec { name: "id", kinds: INT },
        ColumnSpec { name: "name", kinds: OBJECT },
        ColumnSpec { name: "datetime", kinds: OBJECT },
        ColumnSpec { name: "department_id", kinds: INT_OR_FLOAT },
        ColumnSpec { name: "job_id", kinds: INT_OR_FLOAT },
    ],
    datetime_column: Some(2),
};

pub const DEPARTMENTS: FileSchema = FileSchema {
    filename: "departments.csv",
    columns: &[
        ColumnSpec { name: "id", kinds: INT },
        ColumnSpec { name: "department", kinds: OBJECT },
    ],
    datetime_column: None,
};

pub const JOBS: FileSchema = FileSchema {
    filename: "jobs.csv",
    columns: &[
        ColumnSpec { name: "id", kinds: INT },
        ColumnSpec { name: "job", kinds: OBJECT },
    ],
    datetime_column: None,
};

pub static REGISTRY: [&FileSchema; 3] = [&HIRED_EMPLOYEES, &DEPARTMENTS, &JOBS];

pub fn lookup(filename: &str) -> Option<&'static FileSchema> {
    REGISTRY.iter().copied().find(|schema| schema.filename == filename)
}

pub fn valid_filenames() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|schema| schema.filename)
}
