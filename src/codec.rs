//! Record batch wire format.
//!
//! ## Encoding Format
//!
//! All integers are little-endian. Every length field precedes its payload so
//! the blob can be consumed as one forward-only stream.
//!
//! - Header
//!   - Number of columns (2 bytes, u16)
//!   - Number of rows (4 bytes, u32)
//! - Schema, once per column in column order
//!   - Name length (1 byte, u8) followed by the UTF-8 name
//!   - Type code (1 byte): 1=Int32, 2=Float64, 3=Utf8, 4=Bool
//!   - Nullable flag (1 byte): 0 or 1
//! - Buffers, once per column in the same order
//!   - Values length (4 bytes, u32) followed by the values buffer
//!   - Offsets length (4 bytes, u32, 0 unless Utf8) followed by
//!     `(rows + 1)` u32 offsets
//!   - Nulls length (4 bytes, u32, 0 unless nullable) followed by the
//!     bit-packed null bitmap

use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::batch::{Field, RecordBatch};
use crate::bitpack::BitPack;
use crate::column::{Column, ColumnBuffers};
use crate::error::IonicError;
use crate::types::{DataType, Value};

/// Size of the fixed header (u16 column count + u32 row count).
pub const HEADER_LEN: usize = 6;

/// Header and schema of an encoded batch, read without touching buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetadata {
    /// Number of columns.
    pub num_columns: u16,
    /// Number of rows.
    pub num_rows: u32,
    /// Schema entries in column order.
    pub fields: Vec<Field>,
    /// Total size of the encoded batch in bytes.
    pub total_bytes: usize,
}

impl RecordBatch {
    /// Serialize the batch into the wire format.
    ///
    /// # Example
    /// ```
    /// use ionic_rs::{Column, DataType, RecordBatch};
    ///
    /// let batch = RecordBatch::try_new(vec![
    ///     Column::new("id", DataType::Int32, [1, 2]).unwrap(),
    ///     Column::new("flag", DataType::Bool, [true, false]).unwrap(),
    /// ])
    /// .unwrap();
    ///
    /// let encoded = batch.encode().unwrap();
    /// assert_eq!(&encoded[..6], &[0x02, 0x00, 0x02, 0x00, 0x00, 0x00]);
    /// assert_eq!(RecordBatch::decode(&encoded).unwrap(), batch);
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>, IonicError> {
        let buffers = encode_column_buffers(self.columns())?;

        let schema_len: usize = self.columns().iter().map(|c| 3 + c.name().len()).sum();
        let buffers_len: usize = buffers.iter().map(|b| 12 + b.byte_len()).sum();
        let mut result = Vec::with_capacity(HEADER_LEN + schema_len + buffers_len);

        // Header
        result.extend_from_slice(&(self.num_columns() as u16).to_le_bytes());
        result.extend_from_slice(&(self.num_rows() as u32).to_le_bytes());

        // Schema
        for column in self.columns() {
            let name = column.name().as_bytes();
            result.push(name.len() as u8);
            result.extend_from_slice(name);
            result.push(column.dtype().code());
            result.push(u8::from(column.nullable()));
        }

        // Buffers
        for buff in &buffers {
            write_region(&mut result, "values buffer length", Some(buff.values()))?;
            write_region(&mut result, "offsets buffer length", buff.offsets())?;
            write_region(&mut result, "nulls buffer length", buff.nulls())?;
        }

        debug!(
            "Encoded record batch: {} columns, {} rows, {} bytes",
            self.num_columns(),
            self.num_rows(),
            result.len()
        );

        Ok(result)
    }

    /// Decode a batch produced by [`RecordBatch::encode`].
    ///
    /// Every value is reconstructed, including nulls. Truncated or
    /// inconsistent input fails with `MalformedBatch` and an unknown type
    /// code with `UnknownType`; no partial batch is ever returned.
    pub fn decode(bytes: &[u8]) -> Result<RecordBatch, IonicError> {
        let mut reader = BitPack::<&[u8]>::new(bytes);
        let (num_rows, fields) = read_header_and_schema(&mut reader)?;
        let num_rows = num_rows as usize;

        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            let values_buf = read_region(&mut reader)?;
            let offsets_buf = read_region(&mut reader)?;
            let nulls_buf = read_region(&mut reader)?;

            trace!(
                "Decoding column '{}' ({}): values={} offsets={} nulls={}",
                field.name,
                field.dtype,
                values_buf.len(),
                offsets_buf.len(),
                nulls_buf.len()
            );

            let values = decode_values(&field, num_rows, values_buf, offsets_buf, nulls_buf)?;
            let column = Column::try_new(field.name, field.dtype, values, field.nullable)
                .map_err(into_malformed)?;
            columns.push(column);
        }

        if reader.remaining_bytes() > 0 {
            return Err(IonicError::malformed(format!(
                "{} trailing bytes after last column",
                reader.remaining_bytes()
            )));
        }

        let batch = RecordBatch::try_new(columns).map_err(into_malformed)?;
        debug!(
            "Decoded record batch: {} columns, {} rows, {} bytes",
            batch.num_columns(),
            batch.num_rows(),
            bytes.len()
        );
        Ok(batch)
    }

    /// Read the header and schema of an encoded batch without decoding its
    /// buffers.
    pub fn peek_metadata(bytes: &[u8]) -> Result<BatchMetadata, IonicError> {
        let mut reader = BitPack::<&[u8]>::new(bytes);
        let (num_rows, fields) = read_header_and_schema(&mut reader)?;

        Ok(BatchMetadata {
            num_columns: fields.len() as u16,
            num_rows,
            fields,
            total_bytes: bytes.len(),
        })
    }
}

#[cfg(not(feature = "parallel"))]
fn encode_column_buffers(columns: &[Column]) -> Result<Vec<ColumnBuffers>, IonicError> {
    columns.iter().map(Column::encode_buffers).collect()
}

#[cfg(feature = "parallel")]
fn encode_column_buffers(columns: &[Column]) -> Result<Vec<ColumnBuffers>, IonicError> {
    columns.par_iter().map(Column::encode_buffers).collect()
}

/// Write `u32 length` then the payload; an absent region is a zero length.
fn write_region(
    out: &mut Vec<u8>,
    what: &'static str,
    region: Option<&[u8]>,
) -> Result<(), IonicError> {
    let region = region.unwrap_or_default();
    let len = IonicError::check_u32(what, region.len())?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(region);
    Ok(())
}

fn read_region<'a>(reader: &mut BitPack<&'a [u8]>) -> Result<&'a [u8], IonicError> {
    let len = reader.read(32)? as usize;
    reader.read_bytes(len)
}

fn read_header_and_schema(reader: &mut BitPack<&[u8]>) -> Result<(u32, Vec<Field>), IonicError> {
    if reader.remaining_bytes() < HEADER_LEN {
        return Err(IonicError::malformed("header too short"));
    }

    let num_columns = reader.read(16)? as usize;
    let num_rows = reader.read(32)?;
    if num_columns == 0 {
        return Err(IonicError::malformed("batch declares zero columns"));
    }

    let mut fields = Vec::with_capacity(num_columns);
    for _ in 0..num_columns {
        let name_len = reader.read(8)? as usize;
        let name = std::str::from_utf8(reader.read_bytes(name_len)?)
            .map_err(|e| IonicError::malformed(format!("column name is not UTF-8: {}", e)))?
            .to_owned();
        let dtype = DataType::from_code(reader.read(8)? as u8)?;
        let nullable = match reader.read(8)? {
            0 => false,
            1 => true,
            b => {
                return Err(IonicError::malformed(format!(
                    "invalid nullable flag {} for column '{}'",
                    b, name
                )))
            }
        };
        fields.push(Field {
            name,
            dtype,
            nullable,
        });
    }

    Ok((num_rows, fields))
}

/// Rebuild row values from a column's three regions.
fn decode_values(
    field: &Field,
    num_rows: usize,
    values: &[u8],
    offsets: &[u8],
    nulls: &[u8],
) -> Result<Vec<Value>, IonicError> {
    let expected_nulls = if field.nullable { num_rows.div_ceil(8) } else { 0 };
    if nulls.len() != expected_nulls {
        return Err(IonicError::malformed(format!(
            "column '{}': nulls length {} but expected {}",
            field.name,
            nulls.len(),
            expected_nulls
        )));
    }
    let mut bitmap = BitPack::<&[u8]>::new(nulls);

    let offsets = decode_offsets(field, num_rows, values.len(), offsets)?;

    let mut out = Vec::with_capacity(num_rows);
    for row in 0..num_rows {
        let present = if field.nullable {
            bitmap.read_bit()?
        } else {
            true
        };

        let slice = match (field.dtype.fixed_width(), &offsets) {
            (Some(width), _) => &values[row * width..(row + 1) * width],
            (None, Some(offsets)) => &values[offsets[row] as usize..offsets[row + 1] as usize],
            (None, None) => {
                return Err(IonicError::malformed(format!(
                    "column '{}' has no offsets",
                    field.name
                )))
            }
        };

        if present {
            out.push(field.dtype.decode(slice)?);
        } else {
            out.push(Value::Null);
        }
    }

    Ok(out)
}

/// Validate region sizes against the schema; returns parsed offsets for Utf8.
fn decode_offsets(
    field: &Field,
    num_rows: usize,
    values_len: usize,
    offsets: &[u8],
) -> Result<Option<Vec<u32>>, IonicError> {
    match field.dtype.fixed_width() {
        Some(width) => {
            if values_len != num_rows * width {
                return Err(IonicError::malformed(format!(
                    "column '{}': values length {} but {} rows of {} need {}",
                    field.name,
                    values_len,
                    num_rows,
                    field.dtype,
                    num_rows * width
                )));
            }
            if !offsets.is_empty() {
                return Err(IonicError::malformed(format!(
                    "column '{}': {} has no offsets but found {} bytes",
                    field.name,
                    field.dtype,
                    offsets.len()
                )));
            }
            Ok(None)
        }
        None => {
            if offsets.len() != (num_rows + 1) * 4 {
                return Err(IonicError::malformed(format!(
                    "column '{}': offsets length {} but expected {}",
                    field.name,
                    offsets.len(),
                    (num_rows + 1) * 4
                )));
            }

            let mut reader = BitPack::<&[u8]>::new(offsets);
            let mut parsed = Vec::with_capacity(num_rows + 1);
            for _ in 0..=num_rows {
                parsed.push(reader.read(32)?);
            }

            if parsed[0] != 0 {
                return Err(IonicError::malformed(format!(
                    "column '{}': first offset is {}",
                    field.name, parsed[0]
                )));
            }
            if let Some(i) = parsed.windows(2).position(|w| w[0] > w[1]) {
                return Err(IonicError::malformed(format!(
                    "column '{}': offsets decrease at row {}",
                    field.name, i
                )));
            }
            if parsed[num_rows] as usize != values_len {
                return Err(IonicError::malformed(format!(
                    "column '{}': last offset {} but values length {}",
                    field.name, parsed[num_rows], values_len
                )));
            }
            Ok(Some(parsed))
        }
    }
}

/// Construction errors surfaced while decoding mean the bytes were bad.
fn into_malformed(err: IonicError) -> IonicError {
    match err {
        IonicError::MalformedBatch(_) => err,
        other => IonicError::MalformedBatch(other.to_string()),
    }
}
