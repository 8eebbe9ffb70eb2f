//! Record batches: row-aligned groups of columns.

use crate::column::Column;
use crate::error::IonicError;
use crate::types::DataType;

/// Schema entry of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column type.
    pub dtype: DataType,
    /// Whether the column carries a null bitmap.
    pub nullable: bool,
}

impl From<&Column> for Field {
    fn from(column: &Column) -> Self {
        Field {
            name: column.name().to_owned(),
            dtype: column.dtype(),
            nullable: column.nullable(),
        }
    }
}

/// A set of named, equal-length columns, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    columns: Vec<Column>,
    num_rows: usize,
}

impl RecordBatch {
    /// Build a batch, checking that there is at least one column and that
    /// every column has the same row count.
    ///
    /// # Example
    /// ```
    /// use ionic_rs::{Column, DataType, RecordBatch};
    ///
    /// let batch = RecordBatch::try_new(vec![
    ///     Column::new("id", DataType::Int32, [1, 2, 3]).unwrap(),
    ///     Column::new("name", DataType::Utf8, ["Alice", "Bob", "Carol"]).unwrap(),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(batch.num_rows(), 3);
    /// assert_eq!(batch.schema(), vec![("id", DataType::Int32), ("name", DataType::Utf8)]);
    /// ```
    pub fn try_new(columns: Vec<Column>) -> Result<Self, IonicError> {
        let first = columns.first().ok_or(IonicError::EmptyBatch)?;
        let num_rows = first.len();

        if let Some(column) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(IonicError::InconsistentLength {
                column: column.name().to_owned(),
                expected: num_rows,
                actual: column.len(),
            });
        }

        if columns.len() > u16::MAX as usize {
            return Err(IonicError::LimitExceeded {
                what: "column count",
                value: columns.len(),
                limit: u16::MAX as usize,
            });
        }
        IonicError::check_u32("row count", num_rows)?;

        Ok(RecordBatch { columns, num_rows })
    }

    /// Number of rows shared by every column.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Columns in construction order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column at position `i`.
    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    /// First column named `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// `(name, type)` pairs in construction order.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.columns.iter().map(|c| (c.name(), c.dtype())).collect()
    }

    /// Full schema entries, including nullability.
    pub fn fields(&self) -> Vec<Field> {
        self.columns.iter().map(Field::from).collect()
    }

    /// Consume the batch, returning its columns.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}
