//! Length-prefixed container of encoded record batches.
//!
//! A container is a plain sequence of frames, each a `u32` little-endian
//! length followed by exactly that many bytes of one encoded batch. There is
//! no index; readers scan forward until end of stream.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::batch::RecordBatch;
use crate::error::IonicError;

/// File extension of frame containers.
pub const EXTENSION: &str = "ionic";

/// Size of a frame's length prefix.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Options for opening frame files.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    /// Capacity of the buffered reader/writer wrapping the file.
    pub buffer_capacity: usize,
    /// Largest frame a reader accepts; longer length prefixes are rejected
    /// before any allocation.
    pub max_frame_len: u32,
    /// Append `.ionic` to paths that do not already carry it.
    pub append_extension: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 64 * 1024,
            max_frame_len: u32::MAX,
            append_extension: true,
        }
    }
}

/// `path` with the `.ionic` extension appended unless already present.
///
/// The extension is appended rather than substituted, so `data.bin` becomes
/// `data.bin.ionic`.
pub fn frame_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext == EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}

fn resolve_path(path: &Path, options: &FrameOptions) -> PathBuf {
    if options.append_extension {
        frame_path(path)
    } else {
        path.to_path_buf()
    }
}

/// Writes record batches as length-prefixed frames.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    inner: W,
    frames_written: u64,
    bytes_written: u64,
}

impl FrameWriter<BufWriter<File>> {
    /// Create (or truncate) a frame file.
    pub fn create(path: impl AsRef<Path>, options: &FrameOptions) -> Result<Self, IonicError> {
        let path = resolve_path(path.as_ref(), options);
        debug!("Creating frame file {}", path.display());
        let file = File::create(&path)?;
        Ok(Self::new(BufWriter::with_capacity(
            options.buffer_capacity,
            file,
        )))
    }
}

impl<W: Write> FrameWriter<W> {
    /// Wrap any writer.
    pub fn new(inner: W) -> Self {
        FrameWriter {
            inner,
            frames_written: 0,
            bytes_written: 0,
        }
    }

    /// Encode `batch` and append it as one frame.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), IonicError> {
        let encoded = batch.encode()?;
        self.write_encoded(&encoded)
    }

    /// Append already-encoded batch bytes as one frame.
    pub fn write_encoded(&mut self, encoded: &[u8]) -> Result<(), IonicError> {
        let len = IonicError::check_u32("frame length", encoded.len())?;
        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(encoded)?;

        self.frames_written += 1;
        self.bytes_written += (FRAME_PREFIX_LEN + encoded.len()) as u64;
        trace!("Wrote frame {} ({} bytes)", self.frames_written, encoded.len());
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Bytes written so far, length prefixes included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), IonicError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W, IonicError> {
        self.inner.flush()?;
        debug!(
            "Finished frame stream: {} frames, {} bytes",
            self.frames_written, self.bytes_written
        );
        Ok(self.inner)
    }
}

/// Reads length-prefixed frames in order until end of stream.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    inner: R,
    max_frame_len: u32,
    frames_read: u64,
    done: bool,
}

impl FrameReader<BufReader<File>> {
    /// Open a frame file for reading.
    pub fn open(path: impl AsRef<Path>, options: &FrameOptions) -> Result<Self, IonicError> {
        let path = resolve_path(path.as_ref(), options);
        debug!("Opening frame file {}", path.display());
        let file = File::open(&path)?;
        Ok(
            Self::new(BufReader::with_capacity(options.buffer_capacity, file))
                .with_max_frame_len(options.max_frame_len),
        )
    }
}

impl<R: Read> FrameReader<R> {
    /// Wrap any reader.
    pub fn new(inner: R) -> Self {
        FrameReader {
            inner,
            max_frame_len: u32::MAX,
            frames_read: 0,
            done: false,
        }
    }

    /// Reject frames longer than `max_frame_len` bytes.
    pub fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Number of frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame's payload, or `None` at a clean end of stream.
    ///
    /// End of stream inside a length prefix or a payload is reported as
    /// `MalformedBatch`.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, IonicError> {
        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        let filled = read_fully(&mut self.inner, &mut prefix)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_PREFIX_LEN {
            return Err(IonicError::malformed(format!(
                "truncated frame length after frame {}: {} of {} bytes",
                self.frames_read, filled, FRAME_PREFIX_LEN
            )));
        }

        let len = u32::from_le_bytes(prefix);
        if len > self.max_frame_len {
            return Err(IonicError::malformed(format!(
                "frame of {} bytes exceeds the limit of {}",
                len, self.max_frame_len
            )));
        }

        let mut payload = vec![0u8; len as usize];
        let filled = read_fully(&mut self.inner, &mut payload)?;
        if filled < payload.len() {
            return Err(IonicError::malformed(format!(
                "truncated frame {}: {} of {} bytes",
                self.frames_read, filled, len
            )));
        }

        self.frames_read += 1;
        trace!("Read frame {} ({} bytes)", self.frames_read, len);
        Ok(Some(payload))
    }

    /// Read and decode the next batch, or `None` at a clean end of stream.
    pub fn next_batch(&mut self) -> Result<Option<RecordBatch>, IonicError> {
        match self.next_frame()? {
            Some(frame) => RecordBatch::decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<RecordBatch, IonicError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` until it is full or the stream ends; returns bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, IonicError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
