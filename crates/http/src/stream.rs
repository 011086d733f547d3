//! Byte stream abstraction backing message bodies and uploads.
//!
//! [`Stream`] wraps a readable/writable/seekable byte source: either an
//! OS file handle or an in-memory buffer. It tracks its capabilities and
//! known size, and every operation on a detached stream fails with a
//! [`StateError`] naming the operation. [`Stream::detach`] hands the raw
//! source back to the caller and is idempotent: size and capability
//! flags reset once and stay reset.
//!
//! [`Body`] is the shared handle messages hold: cloning a `Body` shares
//! the underlying stream, read/write position included. Rendering a
//! `Body` to text seeks to the start when the stream is seekable and
//! swallows every failure into the empty string, because the to-string
//! paths of messages must never raise.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::error::{HttpError, Result, StateError, ValidationError};
use crate::utils::ensure;

/// The raw source a [`Stream`] wraps, returned by [`Stream::detach`].
#[derive(Debug)]
pub enum StreamSource {
    File(File),
    Memory(Cursor<Vec<u8>>),
}

/// A byte stream over a file or an in-memory buffer.
#[derive(Debug)]
pub struct Stream {
    source: Option<StreamSource>,
    size: Option<u64>,
    seekable: bool,
    readable: bool,
    writable: bool,
    mode: String,
    uri: Option<PathBuf>,
}

impl Stream {
    /// An empty read/write memory stream.
    pub fn new() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// A read/write memory stream holding `content`.
    ///
    /// The position is parked at the end, as for a freshly written
    /// buffer; seek or rewind before reading.
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        let data = content.into();
        let len = data.len() as u64;
        let mut cursor = Cursor::new(data);
        cursor.set_position(len);

        Stream {
            size: (len > 0).then_some(len),
            source: Some(StreamSource::Memory(cursor)),
            seekable: true,
            readable: true,
            writable: true,
            mode: "r+".to_owned(),
            uri: None,
        }
    }

    /// Opens a file stream with an `fopen`-style mode string (`r`, `r+`, `w`,
    /// `w+`, `a`, `a+`, `x`, `x+`, `c`, `c+`).
    ///
    /// An unknown mode is a [`ValidationError`]; an OS-level open failure
    /// is an [`HttpError::Io`].
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let open_mode = OpenMode::parse(mode)?;
        let file = open_mode.options().open(path.as_ref()).map_err(|source| HttpError::io("open", source))?;

        let mut source = StreamSource::File(file);
        let size = stat_size(&mut source);
        Ok(Stream {
            source: Some(source),
            size,
            seekable: true,
            readable: open_mode.readable,
            writable: open_mode.writable,
            mode: mode.to_owned(),
            uri: Some(path.as_ref().to_path_buf()),
        })
    }

    /// The known size in bytes, when there is one.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// The current read/write position.
    pub fn tell(&mut self) -> Result<u64> {
        match self.source.as_mut() {
            None => Err(StateError::detached("tell").into()),
            Some(StreamSource::File(file)) => file.stream_position().map_err(|source| HttpError::io("tell", source)),
            Some(StreamSource::Memory(cursor)) => Ok(cursor.position()),
        }
    }

    /// True at or past the end of the source, and always true once
    /// detached.
    pub fn eof(&mut self) -> bool {
        match self.source.as_mut() {
            None => true,
            Some(StreamSource::Memory(cursor)) => cursor.position() >= cursor.get_ref().len() as u64,
            Some(StreamSource::File(file)) => match (file.stream_position(), file.metadata()) {
                (Ok(position), Ok(meta)) => position >= meta.len(),
                _ => true,
            },
        }
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn seek(&mut self, position: SeekFrom) -> Result<()> {
        let source = self.source.as_mut().ok_or(StateError::detached("seek"))?;
        ensure!(self.seekable, StateError::NotSeekable);

        let seeker: &mut dyn Seek = match source {
            StreamSource::File(file) => file,
            StreamSource::Memory(cursor) => cursor,
        };
        seeker.seek(position).map_err(|source| HttpError::io("seek", source))?;
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0))
    }

    /// Reads up to `length` bytes from the current position.
    pub fn read(&mut self, length: usize) -> Result<Bytes> {
        let source = self.source.as_mut().ok_or(StateError::detached("read"))?;
        ensure!(self.readable, StateError::NotReadable);

        let reader: &mut dyn Read = match source {
            StreamSource::File(file) => file,
            StreamSource::Memory(cursor) => cursor,
        };
        let mut buf = Vec::with_capacity(length.min(8192));
        reader.take(length as u64).read_to_end(&mut buf).map_err(|source| HttpError::io("read", source))?;
        Ok(Bytes::from(buf))
    }

    /// Writes all of `data` at the current position and re-stats the
    /// size.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let source = self.source.as_mut().ok_or(StateError::detached("write"))?;
        ensure!(self.writable, StateError::NotWritable);

        let writer: &mut dyn Write = match source {
            StreamSource::File(file) => file,
            StreamSource::Memory(cursor) => cursor,
        };
        writer.write_all(data).map_err(|source| HttpError::io("write", source))?;

        self.size = stat_size(source);
        Ok(data.len())
    }

    /// Reads everything from the current position to the end.
    pub fn contents(&mut self) -> Result<Bytes> {
        let source = self.source.as_mut().ok_or(StateError::detached("get_contents"))?;
        ensure!(self.readable, StateError::NotReadable);

        let reader: &mut dyn Read = match source {
            StreamSource::File(file) => file,
            StreamSource::Memory(cursor) => cursor,
        };
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(|source| HttpError::io("get_contents", source))?;
        Ok(Bytes::from(buf))
    }

    /// Closes the stream by dropping the underlying source.
    pub fn close(&mut self) {
        drop(self.detach());
    }

    /// Hands back the raw source and leaves the stream detached: size
    /// unknown, all capability flags false. Returns `None` when already
    /// detached.
    pub fn detach(&mut self) -> Option<StreamSource> {
        let source = self.source.take();
        if source.is_some() {
            self.size = None;
            self.seekable = false;
            self.readable = false;
            self.writable = false;
            self.mode.clear();
            self.uri = None;
        }
        source
    }

    pub fn metadata(&self) -> Result<StreamMetadata> {
        let source = self.source.as_ref().ok_or(StateError::detached("metadata"))?;
        Ok(StreamMetadata {
            mode: self.mode.clone(),
            seekable: self.seekable,
            uri: self.uri.clone(),
            stream_type: match source {
                StreamSource::File(_) => "STDIO",
                StreamSource::Memory(_) => "TEMP",
            },
        })
    }

    /// Single-key metadata lookup; `None` for an unknown key.
    pub fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        let meta = self.metadata()?;
        Ok(match key {
            "mode" => Some(meta.mode),
            "seekable" => Some(meta.seekable.to_string()),
            "uri" => meta.uri.map(|path| path.display().to_string()),
            "stream_type" => Some(meta.stream_type.to_owned()),
            _ => None,
        })
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptive metadata of a live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub mode: String,
    pub seekable: bool,
    pub uri: Option<PathBuf>,
    pub stream_type: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct OpenMode {
    readable: bool,
    writable: bool,
    append: bool,
    create: bool,
    create_new: bool,
    truncate: bool,
}

impl OpenMode {
    fn parse(mode: &str) -> Result<Self> {
        let (readable, writable, append, create, create_new, truncate) = match mode {
            "r" => (true, false, false, false, false, false),
            "r+" => (true, true, false, false, false, false),
            "w" => (false, true, false, true, false, true),
            "w+" => (true, true, false, true, false, true),
            "a" => (false, true, true, true, false, false),
            "a+" => (true, true, true, true, false, false),
            "x" => (false, true, false, false, true, false),
            "x+" => (true, true, false, false, true, false),
            "c" => (false, true, false, true, false, false),
            "c+" => (true, true, false, true, false, false),
            _ => return Err(ValidationError::invalid_stream_mode(mode).into()),
        };
        Ok(OpenMode { readable, writable, append, create, create_new, truncate })
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.readable)
            .write(self.writable && !self.append)
            .append(self.append)
            .create(self.create && !self.create_new)
            .create_new(self.create_new)
            .truncate(self.truncate);
        options
    }
}

fn stat_size(source: &mut StreamSource) -> Option<u64> {
    let size = match source {
        StreamSource::File(file) => file.metadata().ok().map(|meta| meta.len()),
        StreamSource::Memory(cursor) => Some(cursor.get_ref().len() as u64),
    };
    // a zero-byte source reports an unknown size
    size.filter(|size| *size > 0)
}

/// Shared handle to a [`Stream`], held by messages as their body.
///
/// Clones share the stream, position included. The `Display` rendering
/// never fails: it rewinds seekable streams and substitutes the empty
/// string for any error.
#[derive(Debug, Clone)]
pub struct Body {
    inner: Arc<Mutex<Stream>>,
}

impl Body {
    pub fn new(stream: Stream) -> Self {
        Self { inner: Arc::new(Mutex::new(stream)) }
    }

    /// A fresh empty memory-backed body.
    pub fn empty() -> Self {
        Self::new(Stream::new())
    }

    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        Ok(Self::new(Stream::open(path, mode)?))
    }

    /// Locks the underlying stream. Poisoning is ignored: the stream has
    /// no invariants a panicked writer could break beyond its position.
    pub fn lock(&self) -> MutexGuard<'_, Stream> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> Option<u64> {
        self.lock().size()
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Stream> for Body {
    fn from(stream: Stream) -> Self {
        Self::new(stream)
    }
}

impl From<&str> for Body {
    fn from(content: &str) -> Self {
        Self::new(Stream::from_bytes(content.as_bytes().to_vec()))
    }
}

impl From<String> for Body {
    fn from(content: String) -> Self {
        Self::new(Stream::from_bytes(content.into_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(content: Vec<u8>) -> Self {
        Self::new(Stream::from_bytes(content))
    }
}

impl From<Bytes> for Body {
    fn from(content: Bytes) -> Self {
        Self::new(Stream::from_bytes(Vec::from(content)))
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stream = self.lock();
        if stream.is_seekable() && stream.rewind().is_err() {
            return Ok(());
        }
        match stream.contents() {
            Ok(bytes) => f.write_str(&String::from_utf8_lossy(&bytes)),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn memory_stream_parks_position_at_end() {
        let mut stream = Stream::from_bytes("hello");
        assert_eq!(stream.tell().unwrap(), 5);
        assert!(stream.eof());
        assert_eq!(stream.read(16).unwrap(), Bytes::new());

        stream.rewind().unwrap();
        assert_eq!(stream.read(16).unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn write_extends_and_restats_size() {
        let mut stream = Stream::new();
        assert_eq!(stream.size(), None);

        assert_eq!(stream.write(b"abcd").unwrap(), 4);
        assert_eq!(stream.size(), Some(4));

        stream.rewind().unwrap();
        assert_eq!(stream.contents().unwrap(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn read_honors_requested_length() {
        let mut stream = Stream::from_bytes("abcdef");
        stream.rewind().unwrap();
        assert_eq!(stream.read(2).unwrap(), Bytes::from_static(b"ab"));
        assert_eq!(stream.tell().unwrap(), 2);
        assert_eq!(stream.read(100).unwrap(), Bytes::from_static(b"cdef"));
        assert!(stream.eof());
    }

    #[test]
    fn detach_resets_and_is_idempotent() {
        let mut stream = Stream::from_bytes("data");
        let source = stream.detach();
        assert!(matches!(source, Some(StreamSource::Memory(_))));

        assert_eq!(stream.size(), None);
        assert!(!stream.is_seekable());
        assert!(!stream.is_readable());
        assert!(!stream.is_writable());
        assert!(stream.eof());
        assert!(stream.detach().is_none());
    }

    #[test]
    fn detached_operations_fail_with_state_errors() {
        let mut stream = Stream::new();
        stream.close();

        assert!(matches!(stream.tell(), Err(HttpError::State { .. })));
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(HttpError::State { .. })));
        assert!(matches!(stream.read(1), Err(HttpError::State { .. })));
        assert!(matches!(stream.write(b"x"), Err(HttpError::State { .. })));
        assert!(matches!(stream.contents(), Err(HttpError::State { .. })));
        assert!(matches!(stream.metadata(), Err(HttpError::State { .. })));
    }

    #[test]
    fn unknown_mode_is_a_validation_error() {
        let err = Stream::open("/tmp/whatever", "rb").unwrap_err();
        assert!(matches!(
            err,
            HttpError::Validation { source: ValidationError::InvalidStreamMode { .. } }
        ));
    }

    #[test]
    fn file_stream_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.txt");
        std::fs::write(&path, b"file contents").unwrap();

        let mut stream = Stream::open(&path, "r").unwrap();
        assert_eq!(stream.size(), Some(13));
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert_eq!(stream.read(4).unwrap(), Bytes::from_static(b"file"));

        assert!(matches!(stream.write(b"nope"), Err(HttpError::State { source: StateError::NotWritable })));
    }

    #[test]
    fn write_only_file_stream_rejects_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut stream = Stream::open(&path, "w").unwrap();
        stream.write(b"payload").unwrap();
        assert!(matches!(stream.read(1), Err(HttpError::State { source: StateError::NotReadable })));
        assert_eq!(stream.size(), Some(7));
    }

    #[test]
    fn metadata_reflects_the_source() {
        let stream = Stream::from_bytes("x");
        let meta = stream.metadata().unwrap();
        assert_eq!(meta.stream_type, "TEMP");
        assert_eq!(meta.mode, "r+");
        assert!(meta.seekable);
        assert_eq!(meta.uri, None);

        assert_eq!(stream.metadata_get("stream_type").unwrap(), Some("TEMP".to_owned()));
        assert_eq!(stream.metadata_get("seekable").unwrap(), Some("true".to_owned()));
        assert_eq!(stream.metadata_get("nope").unwrap(), None);
    }

    #[test]
    fn body_clones_share_the_stream() {
        let body = Body::from("shared");
        let clone = body.clone();
        clone.lock().rewind().unwrap();
        let chunk = clone.lock().read(3).unwrap();
        assert_eq!(chunk, Bytes::from_static(b"sha"));

        // position moved through the other handle
        assert_eq!(body.lock().tell().unwrap(), 3);
    }

    #[test]
    fn body_display_rewinds_and_renders() {
        let body = Body::from("hello world");
        assert_eq!(body.to_string(), "hello world");
        // repeated rendering rewinds again
        assert_eq!(body.to_string(), "hello world");
    }

    #[test]
    fn body_display_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.log");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"content").unwrap();
        drop(file);

        // append mode is not readable, so rendering yields nothing
        let body = Body::open(&path, "a").unwrap();
        assert_eq!(body.to_string(), "");

        let detached = Body::empty();
        detached.lock().close();
        assert_eq!(detached.to_string(), "");
    }

    #[test]
    fn empty_source_reports_unknown_size() {
        assert_eq!(Stream::new().size(), None);
        assert_eq!(Stream::from_bytes("").size(), None);
    }
}
