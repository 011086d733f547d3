//! Immutable HTTP message value objects
//!
//! This crate provides the message layer of an HTTP stack: URIs, client
//! requests, responses, server-side requests and the streams backing
//! their bodies, all modeled as immutable value objects. Every `with_*`
//! method returns a modified copy and leaves its receiver untouched, so
//! messages can be shared freely across middleware without defensive
//! cloning.
//!
//! # Features
//!
//! - RFC 3986 URI parsing and validation with normalizing accessors
//! - Requests and responses sharing one header/body protocol via [`Message`]
//! - Server requests built from an explicit [`Globals`] environment snapshot
//! - File- or memory-backed [`Stream`] bodies with capability tracking
//! - Uploaded files as move-once value objects in an arbitrarily nested tree
//! - Fail-fast validation: malformed input is rejected at construction
//!
//! # Example
//!
//! ```
//! use sans_http::{Message, Method, Request, Response, Uri};
//!
//! fn main() -> sans_http::Result<()> {
//!     let uri = Uri::parse("https://api.example.com:443/orders?page=2")?;
//!     let request = Request::new(Method::GET, uri)
//!         .with_header("Accept", "application/json");
//!
//!     // the standard port collapsed into the scheme
//!     assert_eq!(request.uri().port(), None);
//!     assert_eq!(request.header_line("Host"), "api.example.com");
//!
//!     let response = Response::new(404)?
//!         .with_header("Content-Type", "text/plain")
//!         .with_body("not here".into());
//!     assert_eq!(response.reason_phrase(), "Not Found");
//!     assert_eq!(response.header_line("Content-Length"), "8");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod globals;
pub mod headers;
pub mod message;
pub mod request;
pub mod response;
pub mod server;
pub mod stream;
pub mod upload;
pub mod uri;

mod utils;

pub use error::{HttpError, Result, StateError, ValidationError};
pub use globals::Globals;
pub use headers::{HeaderValues, Headers};
pub use message::{Message, Parts};
pub use request::{Method, Request};
pub use response::{canonical_reason, Response};
pub use server::{ParsedBody, ServerRequest};
pub use stream::{Body, Stream, StreamMetadata, StreamSource};
pub use upload::{FileTree, UploadError, UploadedFile};
pub use uri::Uri;
