//! The type system: supported column types and their per-value encoding.
//!
//! Every type has a stable one-byte wire code, an optional fixed byte width
//! and a canonical null value that is written in place of a missing value.
//!
//! | Type    | Code | Width | Null  |
//! |---------|------|-------|-------|
//! | Int32   | 1    | 4     | `0`   |
//! | Float64 | 2    | 8     | `0.0` |
//! | Utf8    | 3    | -     | `""`  |
//! | Bool    | 4    | 1     | false |

use std::fmt;

use crate::error::IonicError;

/// Wire code for [`DataType::Int32`].
const CODE_INT32: u8 = 1;

/// Wire code for [`DataType::Float64`].
const CODE_FLOAT64: u8 = 2;

/// Wire code for [`DataType::Utf8`].
const CODE_UTF8: u8 = 3;

/// Wire code for [`DataType::Bool`].
const CODE_BOOL: u8 = 4;

/// Column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer, 4 bytes little-endian.
    Int32,
    /// IEEE-754 double, 8 bytes little-endian.
    Float64,
    /// Variable-length UTF-8 string, delimited by an offsets array.
    Utf8,
    /// Boolean, one byte (1 or 0).
    Bool,
}

impl DataType {
    /// All types in wire-code order.
    pub const ALL: [DataType; 4] = [
        DataType::Int32,
        DataType::Float64,
        DataType::Utf8,
        DataType::Bool,
    ];

    /// The stable wire code of this type.
    pub fn code(self) -> u8 {
        match self {
            DataType::Int32 => CODE_INT32,
            DataType::Float64 => CODE_FLOAT64,
            DataType::Utf8 => CODE_UTF8,
            DataType::Bool => CODE_BOOL,
        }
    }

    /// Resolve a wire code back to a type.
    ///
    /// # Example
    /// ```
    /// use ionic_rs::{DataType, IonicError};
    ///
    /// assert_eq!(DataType::from_code(3).unwrap(), DataType::Utf8);
    /// assert!(matches!(DataType::from_code(9), Err(IonicError::UnknownType(9))));
    /// ```
    pub fn from_code(code: u8) -> Result<Self, IonicError> {
        match code {
            CODE_INT32 => Ok(DataType::Int32),
            CODE_FLOAT64 => Ok(DataType::Float64),
            CODE_UTF8 => Ok(DataType::Utf8),
            CODE_BOOL => Ok(DataType::Bool),
            other => Err(IonicError::UnknownType(other)),
        }
    }

    /// Byte width of one value, or `None` for variable-length types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::Int32 => Some(4),
            DataType::Float64 => Some(8),
            DataType::Bool => Some(1),
            DataType::Utf8 => None,
        }
    }

    /// The canonical value substituted for nulls when encoding.
    pub fn null_value(self) -> Value {
        match self {
            DataType::Int32 => Value::Int32(0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::Utf8 => Value::Utf8(String::new()),
            DataType::Bool => Value::Bool(false),
        }
    }

    /// Whether `value` is null or of this type.
    pub fn conforms(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (DataType::Int32, Value::Int32(_))
                | (DataType::Float64, Value::Float64(_))
                | (DataType::Utf8, Value::Utf8(_))
                | (DataType::Bool, Value::Bool(_))
        )
    }

    /// Encode a single value.
    ///
    /// Nulls are written as [`DataType::null_value`]. Strings are written as
    /// raw UTF-8 with no length prefix or terminator.
    ///
    /// # Example
    /// ```
    /// use ionic_rs::{DataType, Value};
    ///
    /// assert_eq!(DataType::Int32.encode(&Value::Int32(1)).unwrap(), vec![1, 0, 0, 0]);
    /// assert_eq!(DataType::Bool.encode(&Value::Null).unwrap(), vec![0]);
    /// assert!(DataType::Utf8.encode(&Value::Int32(1)).is_err());
    /// ```
    pub fn encode(self, value: &Value) -> Result<Vec<u8>, IonicError> {
        let mut out = Vec::with_capacity(self.fixed_width().unwrap_or(0));
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Encode a single value, appending to `out`.
    pub fn encode_into(self, value: &Value, out: &mut Vec<u8>) -> Result<(), IonicError> {
        match (self, value) {
            (DataType::Int32, Value::Int32(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (DataType::Float64, Value::Float64(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (DataType::Utf8, Value::Utf8(s)) => out.extend_from_slice(s.as_bytes()),
            (DataType::Bool, Value::Bool(b)) => out.push(u8::from(*b)),
            (_, Value::Null) => return self.encode_into(&self.null_value(), out),
            (expected, other) => {
                return Err(IonicError::TypeMismatch {
                    expected,
                    found: other.kind(),
                })
            }
        }
        Ok(())
    }

    /// Decode one non-null value from exactly the bytes `encode` produced.
    pub fn decode(self, bytes: &[u8]) -> Result<Value, IonicError> {
        if let Some(width) = self.fixed_width() {
            if bytes.len() != width {
                return Err(IonicError::malformed(format!(
                    "{} value needs {} bytes, got {}",
                    self,
                    width,
                    bytes.len()
                )));
            }
        }

        match self {
            DataType::Int32 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                Ok(Value::Int32(i32::from_le_bytes(raw)))
            }
            DataType::Float64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Ok(Value::Float64(f64::from_le_bytes(raw)))
            }
            DataType::Bool => match bytes[0] {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                b => Err(IonicError::malformed(format!("invalid bool byte {:#04x}", b))),
            },
            DataType::Utf8 => std::str::from_utf8(bytes)
                .map(|s| Value::Utf8(s.to_owned()))
                .map_err(|e| IonicError::malformed(format!("invalid UTF-8 string: {}", e))),
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = IonicError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        DataType::from_code(code)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int32 => "Int32",
            DataType::Float64 => "Float64",
            DataType::Utf8 => "Utf8",
            DataType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

/// A single cell: a typed value or an explicit null.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 32-bit signed integer.
    Int32(i32),
    /// A 64-bit float.
    Float64(f64),
    /// A UTF-8 string.
    Utf8(String),
    /// A boolean.
    Bool(bool),
    /// Missing value.
    Null,
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int32(_) => "Int32",
            Value::Float64(_) => "Float64",
            Value::Utf8(_) => "Utf8",
            Value::Bool(_) => "Bool",
            Value::Null => "Null",
        }
    }

    /// The string slice, if this is a `Utf8` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
