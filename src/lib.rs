//! # ionic-rs
//!
//! A columnar record batch encoding engine.
//!
//! ## Overview
//!
//! Typed, row-aligned columns are serialized into one compact,
//! self-describing blob, modeled after columnar table formats:
//!
//! 1. **Fixed-width value buffers**: `Int32`, `Float64` and `Bool` values are
//!    packed little-endian, one slot per row
//! 2. **Null bitmaps**: one bit per row, least-significant bit first, for
//!    columns declared nullable
//! 3. **Offset arrays**: `rows + 1` cumulative `u32` byte offsets delimiting
//!    the UTF-8 strings of `Utf8` columns
//!
//! The blob carries a header (column and row counts), a schema section
//! (name, type code, nullable flag per column) and then each column's
//! length-prefixed buffers, in column order. See [`codec`] for the byte
//! layout.
//!
//! ## Quick Start
//!
//! ```rust
//! use ionic_rs::{Column, DataType, RecordBatch, Value};
//!
//! let batch = RecordBatch::try_new(vec![
//!     Column::new("id", DataType::Int32, [1, 2, 3]).unwrap(),
//!     Column::new_nullable("name", DataType::Utf8, [Some("Alice"), None, Some("Carol")]).unwrap(),
//! ])
//! .unwrap();
//!
//! let encoded = batch.encode().unwrap();
//! let decoded = RecordBatch::decode(&encoded).unwrap();
//!
//! assert_eq!(decoded, batch);
//! assert_eq!(decoded.column(1).unwrap().value(1), Some(&Value::Null));
//! ```
//!
//! ## Frames
//!
//! [`FrameWriter`] appends encoded batches to any `Write` (or a `.ionic`
//! file) as `u32`-length-prefixed frames, and [`FrameReader`] scans them back:
//!
//! ```rust
//! use ionic_rs::{Column, DataType, FrameReader, FrameWriter, RecordBatch};
//!
//! let batch = RecordBatch::try_new(vec![Column::new("x", DataType::Bool, [true]).unwrap()]).unwrap();
//!
//! let mut writer = FrameWriter::new(Vec::new());
//! writer.write(&batch).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let batches: Vec<_> = FrameReader::new(bytes.as_slice()).collect::<Result<_, _>>().unwrap();
//! assert_eq!(batches, vec![batch]);
//! ```
//!
//! ## Features
//!
//! - `parallel`: derive per-column buffers on the rayon thread pool during
//!   [`RecordBatch::encode`]. Output is byte-identical to the sequential path.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod batch;
pub mod bitpack;
pub mod codec;
mod column;
mod error;
pub mod frame;
mod types;

pub use batch::{Field, RecordBatch};
pub use codec::BatchMetadata;
pub use column::{Column, ColumnBuffers, MAX_NAME_LEN};
pub use error::IonicError;
pub use frame::{frame_path, FrameOptions, FrameReader, FrameWriter};
pub use types::{DataType, Value};

/// Convenience type alias for Results with IonicError.
pub type Result<T> = std::result::Result<T, IonicError>;
