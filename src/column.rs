//! Columns and their derived buffers.
//!
//! A [`Column`] is validated and its derived state (null bitmap, string
//! offsets) is computed once, at construction. [`Column::encode_buffers`]
//! serializes that state into the three byte regions written to the wire.

use crate::bitpack::BitPack;
use crate::error::IonicError;
use crate::types::{DataType, Value};

/// Longest column name, in UTF-8 bytes, that fits the `u8` length prefix.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Encoded byte regions of a single column.
///
/// Produced by [`Column::encode_buffers`]; the bytes are owned and share
/// nothing with the source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBuffers {
    values: Vec<u8>,
    nulls: Option<Vec<u8>>,
    offsets: Option<Vec<u8>>,
}

impl ColumnBuffers {
    /// Row-ordered encoded values.
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Bit-packed null bitmap, present iff the column is nullable.
    pub fn nulls(&self) -> Option<&[u8]> {
        self.nulls.as_deref()
    }

    /// `rows + 1` little-endian `u32` offsets, present iff the column is Utf8.
    pub fn offsets(&self) -> Option<&[u8]> {
        self.offsets.as_deref()
    }

    /// Total bytes across all three regions.
    pub fn byte_len(&self) -> usize {
        self.values.len()
            + self.nulls.as_ref().map_or(0, Vec::len)
            + self.offsets.as_ref().map_or(0, Vec::len)
    }

    /// Split into `(values, nulls, offsets)`.
    pub fn into_parts(self) -> (Vec<u8>, Option<Vec<u8>>, Option<Vec<u8>>) {
        (self.values, self.nulls, self.offsets)
    }
}

/// A named, typed sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DataType,
    values: Vec<Value>,
    nullable: bool,
    null_bitmap: Option<Vec<u8>>,
    offsets: Option<Vec<u32>>,
}

impl Column {
    /// Build a non-nullable column.
    ///
    /// # Example
    /// ```
    /// use ionic_rs::{Column, DataType};
    ///
    /// let col = Column::new("name", DataType::Utf8, ["hi", "", "hallo"]).unwrap();
    /// assert_eq!(col.offsets(), Some(&[0, 2, 2, 7][..]));
    /// ```
    pub fn new<V: Into<Value>>(
        name: impl Into<String>,
        dtype: DataType,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, IonicError> {
        Self::try_new(name, dtype, values.into_iter().map(Into::into).collect(), false)
    }

    /// Build a nullable column; `None` items become nulls.
    ///
    /// # Example
    /// ```
    /// use ionic_rs::{Column, DataType};
    ///
    /// let col = Column::new_nullable("n", DataType::Int32, [Some(1), None, Some(3)]).unwrap();
    /// assert_eq!(col.null_bitmap(), Some(&[0b0000_0101][..]));
    /// ```
    pub fn new_nullable<V: Into<Value>>(
        name: impl Into<String>,
        dtype: DataType,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, IonicError> {
        Self::try_new(name, dtype, values.into_iter().map(Into::into).collect(), true)
    }

    /// Build a column, validating values and deriving the null bitmap and
    /// string offsets.
    pub fn try_new(
        name: impl Into<String>,
        dtype: DataType,
        values: Vec<Value>,
        nullable: bool,
    ) -> Result<Self, IonicError> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(IonicError::InvalidColumnName(name));
        }

        for value in &values {
            if value.is_null() {
                if !nullable {
                    return Err(IonicError::UnexpectedNull { column: name });
                }
            } else if !dtype.conforms(value) {
                return Err(IonicError::TypeMismatch {
                    expected: dtype,
                    found: value.kind(),
                });
            }
        }

        let null_bitmap = if nullable {
            Some(build_null_bitmap(&values)?)
        } else {
            None
        };
        let offsets = match dtype {
            DataType::Utf8 => Some(build_offsets(&values)?),
            DataType::Int32 | DataType::Float64 | DataType::Bool => None,
        };

        Ok(Column {
            name,
            dtype,
            values,
            nullable,
            null_bitmap,
            offsets,
        })
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column type.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Whether the column may hold nulls.
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// All values in row order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at row `i`.
    pub fn value(&self, i: usize) -> Option<&Value> {
        self.values.get(i)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of null rows.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Whether row `i` holds a value, read from the null bitmap.
    ///
    /// Non-nullable columns report every in-range row as valid.
    pub fn is_valid(&self, i: usize) -> bool {
        if i >= self.len() {
            return false;
        }
        match &self.null_bitmap {
            Some(bitmap) => (bitmap[i / 8] >> (i % 8)) & 1 == 1,
            None => true,
        }
    }

    /// Bit-packed null bitmap (1 = present), present iff nullable.
    pub fn null_bitmap(&self) -> Option<&[u8]> {
        self.null_bitmap.as_deref()
    }

    /// Cumulative byte offsets, present iff the column is Utf8.
    pub fn offsets(&self) -> Option<&[u32]> {
        self.offsets.as_deref()
    }

    /// Serialize the column into its values, offsets and nulls regions.
    pub fn encode_buffers(&self) -> Result<ColumnBuffers, IonicError> {
        let capacity = match (self.dtype.fixed_width(), &self.offsets) {
            (Some(width), _) => self.values.len() * width,
            (None, Some(offsets)) => offsets.last().copied().unwrap_or(0) as usize,
            (None, None) => 0,
        };

        let mut values = Vec::with_capacity(capacity);
        for value in &self.values {
            self.dtype.encode_into(value, &mut values)?;
        }

        let offsets = self.offsets.as_ref().map(|offsets| {
            offsets
                .iter()
                .flat_map(|off| off.to_le_bytes())
                .collect::<Vec<u8>>()
        });

        Ok(ColumnBuffers {
            values,
            nulls: self.null_bitmap.clone(),
            offsets,
        })
    }
}

/// One bit per row, 1 where the value is present.
fn build_null_bitmap(values: &[Value]) -> Result<Vec<u8>, IonicError> {
    let mut bitpack = BitPack::<Vec<u8>>::with_capacity(values.len().div_ceil(8));
    for value in values {
        bitpack.write_bit(!value.is_null())?;
    }
    Ok(bitpack.into_vec())
}

/// `values.len() + 1` cumulative UTF-8 byte offsets; nulls contribute 0.
fn build_offsets(values: &[Value]) -> Result<Vec<u32>, IonicError> {
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut cursor = 0usize;
    offsets.push(0);

    for value in values {
        let len = match value {
            Value::Null => 0,
            Value::Utf8(s) => s.len(),
            other => {
                return Err(IonicError::TypeMismatch {
                    expected: DataType::Utf8,
                    found: other.kind(),
                })
            }
        };
        cursor += len;
        offsets.push(IonicError::check_u32("string buffer length", cursor)?);
    }

    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nullable_ints(pattern: &[bool]) -> Column {
        let values: Vec<Option<i32>> = pattern
            .iter()
            .enumerate()
            .map(|(i, &present)| present.then_some(i as i32))
            .collect();
        Column::new_nullable("c", DataType::Int32, values).unwrap()
    }

    #[test]
    fn test_bitmap_scenario() {
        let col = Column::new_nullable("n", DataType::Int32, [Some(1), None, Some(3)]).unwrap();
        assert_eq!(col.null_bitmap(), Some(&[0b0000_0101u8][..]));
        assert!(col.is_valid(0));
        assert!(!col.is_valid(1));
        assert!(col.is_valid(2));
        assert!(!col.is_valid(3));
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_bitmap_lengths_and_bits() {
        for rows in [0usize, 1, 7, 8, 9, 16] {
            let pattern: Vec<bool> = (0..rows).map(|i| i % 3 != 1).collect();
            let col = nullable_ints(&pattern);
            let bitmap = col.null_bitmap().unwrap();

            assert_eq!(bitmap.len(), rows.div_ceil(8), "rows={}", rows);
            for (i, &present) in pattern.iter().enumerate() {
                let bit = (bitmap[i / 8] >> (i % 8)) & 1;
                assert_eq!(bit == 1, present, "rows={} row={}", rows, i);
            }
            // unused high bits of the final byte stay zero
            if rows % 8 != 0 {
                let last = bitmap[bitmap.len() - 1];
                assert_eq!(last >> (rows % 8), 0, "rows={}", rows);
            }
        }
    }

    #[test]
    fn test_no_bitmap_when_not_nullable() {
        let col = Column::new("id", DataType::Int32, [1, 2, 3]).unwrap();
        assert!(col.null_bitmap().is_none());
        assert!(col.encode_buffers().unwrap().nulls().is_none());
        assert!(col.is_valid(2));
    }

    #[test]
    fn test_offsets_scenario() {
        let col = Column::new("s", DataType::Utf8, ["hi", "", "hallo"]).unwrap();
        assert_eq!(col.offsets(), Some(&[0u32, 2, 2, 7][..]));

        let buffers = col.encode_buffers().unwrap();
        assert_eq!(buffers.values(), b"hihallo");
        let expected: Vec<u8> = [0u32, 2, 2, 7].iter().flat_map(|o| o.to_le_bytes()).collect();
        assert_eq!(buffers.offsets(), Some(expected.as_slice()));
    }

    #[test]
    fn test_offsets_with_nulls() {
        let col =
            Column::new_nullable("s", DataType::Utf8, [Some("ab"), None, Some("ñ")]).unwrap();
        let offsets = col.offsets().unwrap();
        assert_eq!(offsets, &[0, 2, 2, 4]);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));

        let buffers = col.encode_buffers().unwrap();
        assert_eq!(offsets[col.len()] as usize, buffers.values().len());
        assert_eq!(buffers.nulls(), Some(&[0b0000_0101u8][..]));
    }

    #[test]
    fn test_offsets_empty_column() {
        let col = Column::new("s", DataType::Utf8, Vec::<String>::new()).unwrap();
        assert_eq!(col.offsets(), Some(&[0u32][..]));
        assert!(col.encode_buffers().unwrap().values().is_empty());
    }

    #[test]
    fn test_fixed_width_buffer_sizes() {
        let ints = Column::new("i", DataType::Int32, [1, 2, 3]).unwrap();
        let floats = Column::new("f", DataType::Float64, [1.0, 2.0]).unwrap();
        let bools = Column::new_nullable("b", DataType::Bool, [Some(true), None]).unwrap();

        assert_eq!(ints.encode_buffers().unwrap().values().len(), 12);
        assert_eq!(floats.encode_buffers().unwrap().values().len(), 16);
        assert_eq!(bools.encode_buffers().unwrap().values(), &[1, 0]);
        assert!(ints.encode_buffers().unwrap().offsets().is_none());
    }

    #[test]
    fn test_null_substitutes_canonical_value() {
        let col = Column::new_nullable("n", DataType::Int32, [Some(7), None]).unwrap();
        let buffers = col.encode_buffers().unwrap();
        assert_eq!(buffers.values(), &[7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(buffers.byte_len(), 9);
    }

    #[test]
    fn test_type_mismatch() {
        let result = Column::try_new("s", DataType::Utf8, vec![Value::Int32(1)], false);
        assert!(matches!(
            result,
            Err(IonicError::TypeMismatch {
                expected: DataType::Utf8,
                ..
            })
        ));
    }

    #[test]
    fn test_build_offsets_rejects_non_string() {
        let result = build_offsets(&[Value::from("a"), Value::Bool(true)]);
        assert!(matches!(result, Err(IonicError::TypeMismatch { .. })));
    }

    #[test]
    fn test_null_in_non_nullable_column() {
        let result = Column::try_new("id", DataType::Int32, vec![Value::Int32(1), Value::Null], false);
        assert!(matches!(result, Err(IonicError::UnexpectedNull { column }) if column == "id"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            Column::new("", DataType::Int32, [1]),
            Err(IonicError::InvalidColumnName(_))
        ));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            Column::new(long, DataType::Int32, [1]),
            Err(IonicError::InvalidColumnName(_))
        ));
        assert!(Column::new("x".repeat(MAX_NAME_LEN), DataType::Int32, [1]).is_ok());
    }

    #[test]
    fn test_into_parts() {
        let col = Column::new_nullable("s", DataType::Utf8, [Some("a")]).unwrap();
        let (values, nulls, offsets) = col.encode_buffers().unwrap().into_parts();
        assert_eq!(values, b"a".to_vec());
        assert_eq!(nulls, Some(vec![1]));
        assert_eq!(offsets.map(|o| o.len()), Some(8));
    }
}
