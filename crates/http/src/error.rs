//! Error types for message construction and stream access.
//!
//! Three kinds of failure exist, and all of them are raised synchronously
//! at the point of input:
//!
//! - [`ValidationError`]: malformed input handed to a constructor or a
//!   `with_*` method (URI components, methods, status codes, ...)
//! - [`StateError`]: an operation on a resource that can no longer serve
//!   it (detached stream, already-moved upload)
//! - [`HttpError::Io`]: an underlying system call failed, tagged with the
//!   name of the failing operation
//!
//! The `Display`/to-string rendering paths are the one exception to the
//! fail-fast rule: they never raise and substitute an empty string instead.

use std::io;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("validation error: {source}")]
    Validation {
        #[from]
        source: ValidationError,
    },

    #[error("state error: {source}")]
    State {
        #[from]
        source: StateError,
    },

    #[error("{operation} failed: {source}")]
    Io { operation: &'static str, source: io::Error },
}

impl HttpError {
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }
}

/// Malformed input. Every variant names the grammar or shape that was
/// violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("uri is malformed")]
    MalformedUri,

    #[error("scheme must be compliant with the RFC 3986 scheme grammar")]
    InvalidScheme,

    #[error("host must be compliant with the RFC 3986 reg-name grammar")]
    InvalidRegName,

    #[error("host must be a valid RFC 3986 IPv4 address")]
    InvalidIpv4,

    #[error("host must be a valid RFC 3986 IPv6 address")]
    InvalidIpv6,

    #[error("host must be compliant with the RFC 3986 IPvFuture grammar")]
    InvalidIpvFuture,

    #[error("tcp or udp port must be between 1 and 65535")]
    InvalidPort,

    #[error("path of a uri without a scheme cannot begin with a colon")]
    PathStartsWithColon,

    #[error("path of a uri without an authority cannot begin with two slashes")]
    PathStartsWithDoubleSlash,

    #[error("path of a uri with an authority must be empty or begin with a slash")]
    PathNotRooted,

    #[error("path must be compliant with the RFC 3986 path grammar")]
    InvalidPathChars,

    #[error("query must be compliant with the RFC 3986 query grammar")]
    InvalidQueryChars,

    #[error("http method must be compliant with the RFC 7230 token grammar")]
    InvalidMethod,

    #[error("status code 306 is unused")]
    UnusedStatusCode,

    #[error("status code must be between 100 and 599")]
    StatusCodeOutOfRange,

    #[error("invalid stream mode: {mode}")]
    InvalidStreamMode { mode: String },

    #[error("upload stream is not readable")]
    UnreadableUploadStream,

    #[error("upload error code must be one of the standard upload error codes: {code}")]
    InvalidUploadErrorCode { code: u64 },

    #[error("invalid structure of uploaded files tree: {reason}")]
    InvalidUploadTree { reason: String },

    #[error("target path can not be empty")]
    EmptyTargetPath,

    #[error("parsed body must be a map or a structured record")]
    ScalarParsedBody,

    #[error("http/1.1 request must contain a host header")]
    MissingHostHeader,
}

impl ValidationError {
    pub fn invalid_stream_mode<S: ToString>(mode: S) -> Self {
        Self::InvalidStreamMode { mode: mode.to_string() }
    }

    pub fn invalid_upload_tree<S: ToString>(reason: S) -> Self {
        Self::InvalidUploadTree { reason: reason.to_string() }
    }
}

/// Operations issued against a resource that has left its usable state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("stream is detached, {operation} is not available")]
    Detached { operation: &'static str },

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("stream is not readable")]
    NotReadable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("uploaded file is already moved")]
    AlreadyMoved,
}

impl StateError {
    pub fn detached(operation: &'static str) -> Self {
        Self::Detached { operation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_carries_operation_name() {
        let err = HttpError::io("seek", io::Error::from(io::ErrorKind::InvalidInput));
        assert!(err.to_string().starts_with("seek failed"));
    }

    #[test]
    fn validation_error_converts_into_http_error() {
        let err: HttpError = ValidationError::InvalidScheme.into();
        assert!(matches!(err, HttpError::Validation { .. }));
    }
}
