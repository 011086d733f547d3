//! Inbound request representation for server-side handling.
//!
//! [`ServerRequest`] wraps a [`Request`] with everything a handler needs
//! beyond the wire message: the server environment it arrived with,
//! decoded cookie and query parameters, the normalized upload tree, the
//! parsed body and free-form per-request attributes. Like every message
//! type here it is immutable: each `with_*` method returns a modified
//! copy.
//!
//! [`ServerRequest::from_globals`] builds the whole thing from a
//! [`Globals`] snapshot, which is how a server binding hands a request
//! over.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::globals::Globals;
use crate::message::{Message, Parts};
use crate::request::{Method, Request};
use crate::stream::Body;
use crate::upload::{self, FileTree};
use crate::uri::Uri;
use crate::utils::ensure;

/// The decoded request body, when a decoder produced one.
#[derive(Debug, Clone, Default)]
pub enum ParsedBody {
    /// No decoder ran, or the body was empty.
    #[default]
    Absent,
    /// Key/value form data.
    Map(BTreeMap<String, Value>),
    /// A structured document, e.g. a decoded JSON object or array.
    Record(Value),
}

impl ParsedBody {
    /// Classifies a decoded value. `Null` reads as absent; a bare
    /// scalar is rejected because handlers expect structured data.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Object(map) => Ok(Self::Map(map.into_iter().collect())),
            Value::Array(_) => Ok(Self::Record(value)),
            _ => Err(ValidationError::ScalarParsedBody.into()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// An inbound HTTP request with its server-side context.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    request: Request,
    server_params: BTreeMap<String, String>,
    cookie_params: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
    uploaded_files: BTreeMap<String, FileTree>,
    parsed_body: ParsedBody,
    attributes: BTreeMap<String, Value>,
}

impl Message for ServerRequest {
    fn parts(&self) -> &Parts {
        self.request.parts()
    }

    fn parts_mut(&mut self) -> &mut Parts {
        self.request.parts_mut()
    }
}

impl ServerRequest {
    pub fn new(method: Method, uri: Uri, server_params: BTreeMap<String, String>) -> Self {
        ServerRequest {
            request: Request::new(method, uri),
            server_params,
            cookie_params: BTreeMap::new(),
            query_params: BTreeMap::new(),
            uploaded_files: BTreeMap::new(),
            parsed_body: ParsedBody::Absent,
            attributes: BTreeMap::new(),
        }
    }

    /// Builds a request from a server environment snapshot.
    ///
    /// The method honors a `_method` form override before
    /// `REQUEST_METHOD`; the protocol version comes from
    /// `SERVER_PROTOCOL`; headers are synthesized from the `HTTP_*`
    /// variables with comma-separated values split apart; form
    /// parameters become the parsed body. An HTTP/1.1 request without a
    /// `Host` header is rejected.
    pub fn from_globals(globals: &Globals) -> Result<Self> {
        let method = match globals.form.get("_method").map(String::as_str).or_else(|| globals.server_get("REQUEST_METHOD")) {
            Some(name) => Method::new(name)?,
            None => Method::GET,
        };
        let version = protocol_version(globals);
        let uri = Uri::from_globals(globals)?;

        let mut request = Self::new(method, uri, globals.server.clone())
            // the constructor derives a Host header from the URI; an
            // inbound request carries only what the client sent
            .without_header("Host")
            .with_protocol_version(version)
            .with_cookie_params(globals.cookies.clone())
            .with_query_params(globals.query.clone())
            .with_uploaded_files(upload::normalize(&globals.files)?)
            .with_parsed_body(form_body(globals))?;

        for (key, value) in &globals.server {
            if let Some(rest) = key.strip_prefix("HTTP_") {
                let name = rest.replace('_', "-").to_ascii_lowercase();
                let values: Vec<String> = value.split(',').map(|part| part.trim().to_owned()).collect();
                request = request.with_added_header(&name, values);
            }
        }

        ensure!(request.protocol_version() != "1.1" || request.has_header("host"), ValidationError::MissingHostHeader);

        let request = request.with_body(Body::from(globals.input.clone()));
        debug!(
            method = %request.method(),
            target = %request.request_target(),
            version = request.protocol_version(),
            "server request built from globals"
        );
        Ok(request)
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn with_method(&self, method: Method) -> Self {
        let mut that = self.clone();
        that.request = that.request.with_method(method);
        that
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut that = self.clone();
        that.request = that.request.with_uri(uri, preserve_host);
        that
    }

    pub fn request_target(&self) -> String {
        self.request.request_target()
    }

    pub fn with_request_target(&self, target: &str) -> Self {
        let mut that = self.clone();
        that.request = that.request.with_request_target(target);
        that
    }

    pub fn server_params(&self) -> &BTreeMap<String, String> {
        &self.server_params
    }

    pub fn cookie_params(&self) -> &BTreeMap<String, String> {
        &self.cookie_params
    }

    pub fn with_cookie_params(&self, cookies: BTreeMap<String, String>) -> Self {
        let mut that = self.clone();
        that.cookie_params = cookies;
        that
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    pub fn with_query_params(&self, query: BTreeMap<String, String>) -> Self {
        let mut that = self.clone();
        that.query_params = query;
        that
    }

    pub fn uploaded_files(&self) -> &BTreeMap<String, FileTree> {
        &self.uploaded_files
    }

    pub fn with_uploaded_files(&self, files: BTreeMap<String, FileTree>) -> Self {
        let mut that = self.clone();
        that.uploaded_files = files;
        that
    }

    pub fn parsed_body(&self) -> &ParsedBody {
        &self.parsed_body
    }

    /// Returns a new request with the decoded body attached. A
    /// [`ParsedBody::Record`] must hold a structured document; bare
    /// scalars are rejected.
    pub fn with_parsed_body(&self, body: ParsedBody) -> Result<Self> {
        if let ParsedBody::Record(value) = &body {
            ensure!(value.is_object() || value.is_array(), ValidationError::ScalarParsedBody);
        }
        let mut that = self.clone();
        that.parsed_body = body;
        Ok(that)
    }

    /// Free-form per-request attributes, typically set by routing and
    /// middleware.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn with_attribute(&self, name: &str, value: impl Into<Value>) -> Self {
        let mut that = self.clone();
        that.attributes.insert(name.to_owned(), value.into());
        that
    }

    /// Returns a new request without the attribute; a no-op clone when
    /// the attribute is absent.
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut that = self.clone();
        that.attributes.remove(name);
        that
    }
}

/// The form parameters as a parsed body, [`ParsedBody::Absent`] when
/// no form data arrived.
fn form_body(globals: &Globals) -> ParsedBody {
    if globals.form.is_empty() {
        return ParsedBody::Absent;
    }
    let map = globals
        .form
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    ParsedBody::Map(map)
}

/// `SERVER_PROTOCOL` is `HTTP/<major>.<minor>` with single-digit
/// parts; anything else falls back to 1.1.
fn protocol_version(globals: &Globals) -> &str {
    let Some(protocol) = globals.server_get("SERVER_PROTOCOL") else {
        return "1.1";
    };
    match protocol.strip_prefix("HTTP/") {
        Some(version) if is_version_text(version) => version,
        _ => "1.1",
    }
}

fn is_version_text(text: &str) -> bool {
    matches!(text.as_bytes(), [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit())
}

impl fmt::Display for ServerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.request.fmt(f)
    }
}
