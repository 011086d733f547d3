//! Uploaded file value objects and the normalized upload tree.
//!
//! [`UploadedFile`] wraps a file received with a request. It is backed
//! either by a temporary path on disk or by an already-open [`Body`],
//! exposes the client-supplied metadata, and can be moved to its final
//! destination exactly once. Clones share the backing resource, so a
//! move through one handle is visible through all of them.
//!
//! [`FileTree`] mirrors the arbitrarily nested field structure a
//! multipart form can produce (`avatar`, `files[]`, `name[details][photo]`),
//! with [`normalize`] converting the raw request descriptors into it.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::error::{HttpError, Result, StateError, ValidationError};
use crate::stream::Body;
use crate::utils::ensure;

/// The standard upload error codes reported alongside each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadError {
    /// The upload completed successfully.
    #[default]
    Ok,
    /// The file exceeds the server-side size limit.
    IniSize,
    /// The file exceeds the size limit declared by the form.
    FormSize,
    /// The file was only partially received.
    Partial,
    /// No file was submitted for the field.
    NoFile,
    /// No temporary directory was available to receive the file.
    NoTmpDir,
    /// The received file could not be written to disk.
    CantWrite,
    /// An extension rejected the upload.
    Extension,
}

impl UploadError {
    /// Decodes the numeric code carried by a raw upload descriptor.
    /// Code 5 is unassigned, like anything above 8.
    pub fn from_code(code: u64) -> Result<Self> {
        let error = match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            _ => return Err(ValidationError::InvalidUploadErrorCode { code }.into()),
        };
        Ok(error)
    }

    pub fn code(self) -> u64 {
        match self {
            Self::Ok => 0,
            Self::IniSize => 1,
            Self::FormSize => 2,
            Self::Partial => 3,
            Self::NoFile => 4,
            Self::NoTmpDir => 6,
            Self::CantWrite => 7,
            Self::Extension => 8,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

#[derive(Debug)]
struct UploadedFileInner {
    path: Option<PathBuf>,
    stream: Mutex<Option<Body>>,
    moved: AtomicBool,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
}

/// A file received with a request, movable to its destination once.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    inner: Arc<UploadedFileInner>,
}

impl UploadedFile {
    /// An upload backed by a file on disk, usually the temporary file
    /// the request body was spooled to.
    pub fn from_path(
        path: impl Into<PathBuf>,
        size: Option<u64>,
        error: UploadError,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Self {
        UploadedFile {
            inner: Arc::new(UploadedFileInner {
                path: Some(path.into()),
                stream: Mutex::new(None),
                moved: AtomicBool::new(false),
                size,
                error,
                client_filename,
                client_media_type,
            }),
        }
    }

    /// An upload backed by an already-open body. The body must be
    /// readable; its known size is used when `size` is `None`.
    pub fn from_body(
        body: Body,
        size: Option<u64>,
        error: UploadError,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Result<Self> {
        ensure!(body.lock().is_readable(), ValidationError::UnreadableUploadStream);
        let size = size.or_else(|| body.size());
        Ok(UploadedFile {
            inner: Arc::new(UploadedFileInner {
                path: None,
                stream: Mutex::new(Some(body)),
                moved: AtomicBool::new(false),
                size,
                error,
                client_filename,
                client_media_type,
            }),
        })
    }

    pub fn size(&self) -> Option<u64> {
        self.inner.size
    }

    pub fn error(&self) -> UploadError {
        self.inner.error
    }

    /// The filename sent by the client. Untrusted input.
    pub fn client_filename(&self) -> Option<&str> {
        self.inner.client_filename.as_deref()
    }

    /// The media type sent by the client. Untrusted input.
    pub fn client_media_type(&self) -> Option<&str> {
        self.inner.client_media_type.as_deref()
    }

    /// A body over the uploaded content. For a path-backed upload the
    /// file is opened on first call and the handle is cached.
    pub fn stream(&self) -> Result<Body> {
        ensure!(!self.inner.moved.load(Ordering::SeqCst), StateError::AlreadyMoved);

        let mut slot = self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(body) = slot.as_ref() {
            return Ok(body.clone());
        }

        let path = self.inner.path.as_ref().ok_or(StateError::detached("upload stream"))?;
        let body = Body::open(path, "r")?;
        *slot = Some(body.clone());
        Ok(body)
    }

    /// Moves the uploaded content to `target`. Allowed exactly once;
    /// every later call, and every later [`Self::stream`] call, fails.
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();
        ensure!(!self.inner.moved.load(Ordering::SeqCst), StateError::AlreadyMoved);
        ensure!(!target.as_os_str().is_empty(), ValidationError::EmptyTargetPath);

        match self.inner.path.as_deref() {
            Some(source) => move_file(source, target)?,
            None => self.drain_into(target)?,
        }

        self.inner.moved.store(true, Ordering::SeqCst);
        debug!(target_path = %target.display(), "uploaded file moved");
        Ok(())
    }

    /// Copies a stream-backed upload into a fresh file at `target` and
    /// closes the source.
    fn drain_into(&self, target: &Path) -> Result<()> {
        let body = self.stream()?;
        let mut source = body.lock();
        if source.is_seekable() {
            source.rewind()?;
        }

        let mut sink = crate::stream::Stream::open(target, "w")?;
        loop {
            let chunk = source.read(8192)?;
            if chunk.is_empty() {
                break;
            }
            sink.write(&chunk)?;
        }
        source.close();
        Ok(())
    }
}

/// Renames `source` to `target`, falling back to copy-and-delete when
/// they live on different filesystems.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            fs::copy(source, target).map_err(|source| HttpError::io("copy", source))?;
            fs::remove_file(source).map_err(|source| HttpError::io("remove", source))?;
            Ok(())
        }
        Err(source) => Err(HttpError::io("rename", source)),
    }
}

/// The nested structure of uploaded files under one top-level field.
#[derive(Debug, Clone)]
pub enum FileTree {
    Leaf(UploadedFile),
    Node(BTreeMap<String, FileTree>),
}

impl FileTree {
    /// The upload itself when this is a leaf.
    pub fn leaf(&self) -> Option<&UploadedFile> {
        match self {
            Self::Leaf(file) => Some(file),
            Self::Node(_) => None,
        }
    }

    /// Descends one level into a node.
    pub fn get(&self, key: &str) -> Option<&FileTree> {
        match self {
            Self::Leaf(_) => None,
            Self::Node(children) => children.get(key),
        }
    }
}

/// Converts raw upload descriptors into a [`FileTree`] per field.
///
/// A descriptor whose `error` member is a number describes a single
/// file (`tmp_name`, `size`, `error`, `name`, `type`). A descriptor
/// whose `error` member is itself an object describes several files
/// submitted under one bracketed field name, with the per-file members
/// spread across parallel objects; those are regrouped per key and
/// normalized recursively. An object without an `error` member is a
/// plain nesting level.
pub fn normalize(files: &serde_json::Map<String, Value>) -> Result<BTreeMap<String, FileTree>> {
    files
        .iter()
        .map(|(name, value)| Ok((name.clone(), tree_from_entry(value)?)))
        .collect()
}

fn tree_from_entry(value: &Value) -> Result<FileTree> {
    let entry = value
        .as_object()
        .ok_or_else(|| ValidationError::invalid_upload_tree("entry is not an object"))?;

    match entry.get("error") {
        Some(error) if error.is_u64() => leaf_from_descriptor(entry, error),
        Some(Value::Object(errors)) => {
            let mut children = BTreeMap::new();
            for key in errors.keys() {
                children.insert(key.clone(), tree_from_entry(&regroup(entry, key))?);
            }
            Ok(FileTree::Node(children))
        }
        Some(_) => Err(ValidationError::invalid_upload_tree("error member is neither a code nor an object").into()),
        None => {
            let mut children = BTreeMap::new();
            for (key, child) in entry {
                children.insert(key.clone(), tree_from_entry(child)?);
            }
            Ok(FileTree::Node(children))
        }
    }
}

fn leaf_from_descriptor(entry: &serde_json::Map<String, Value>, error: &Value) -> Result<FileTree> {
    let code = error.as_u64().unwrap_or_default();
    let tmp_name = entry
        .get("tmp_name")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::invalid_upload_tree("descriptor has no tmp_name"))?;

    Ok(FileTree::Leaf(UploadedFile::from_path(
        tmp_name,
        entry.get("size").and_then(Value::as_u64),
        UploadError::from_code(code)?,
        entry.get("name").and_then(Value::as_str).map(str::to_owned),
        entry.get("type").and_then(Value::as_str).map(str::to_owned),
    )))
}

/// Rebuilds a single-key descriptor out of the parallel per-member
/// objects of a bracketed field.
fn regroup(entry: &serde_json::Map<String, Value>, key: &str) -> Value {
    let mut descriptor = serde_json::Map::new();
    for member in ["tmp_name", "size", "error", "name", "type"] {
        if let Some(Value::Object(values)) = entry.get(member)
            && let Some(value) = values.get(key)
        {
            descriptor.insert(member.to_owned(), value.clone());
        }
    }
    Value::Object(descriptor)
}
