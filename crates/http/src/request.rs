//! Outbound HTTP request representation.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{HttpError, Result, ValidationError};
use crate::headers::Headers;
use crate::message::{Message, Parts};
use crate::uri::Uri;
use crate::utils::ensure;

/// An HTTP method, validated against the RFC 7230 token grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method(Cow<'static, str>);

impl Method {
    pub const GET: Method = Method(Cow::Borrowed("GET"));
    pub const HEAD: Method = Method(Cow::Borrowed("HEAD"));
    pub const POST: Method = Method(Cow::Borrowed("POST"));
    pub const PUT: Method = Method(Cow::Borrowed("PUT"));
    pub const DELETE: Method = Method(Cow::Borrowed("DELETE"));
    pub const CONNECT: Method = Method(Cow::Borrowed("CONNECT"));
    pub const OPTIONS: Method = Method(Cow::Borrowed("OPTIONS"));
    pub const TRACE: Method = Method(Cow::Borrowed("TRACE"));
    pub const PATCH: Method = Method(Cow::Borrowed("PATCH"));

    /// Validates a method token. Methods are case-sensitive and any
    /// token is acceptable, not just the well-known set.
    pub fn new(method: &str) -> Result<Self> {
        ensure!(is_token(method), ValidationError::InvalidMethod);
        Ok(Self(Cow::Owned(method.to_owned())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Method {
    type Err = HttpError;

    fn from_str(method: &str) -> Result<Self> {
        Self::new(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Method {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Method {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// `token = 1*( "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" /
/// "." / "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA )`
fn is_token(text: &str) -> bool {
    !text.is_empty()
        && text.bytes().all(|byte| {
            byte.is_ascii_alphanumeric()
                || matches!(
                    byte,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
                )
        })
}

/// An immutable HTTP request.
///
/// The [`Uri`] is held behind an `Arc` and shared between clones until a
/// `with_uri` call replaces the reference entirely; the `Uri` itself is
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct Request {
    parts: Parts,
    method: Method,
    target: Option<String>,
    uri: Arc<Uri>,
}

impl Message for Request {
    fn parts(&self) -> &Parts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut Parts {
        &mut self.parts
    }
}

impl Request {
    /// Creates a request for `method` and `uri`.
    ///
    /// The protocol version starts at 1.1, so a `Host` header is
    /// synthesized from the URI up front (the empty string when the URI
    /// has no host).
    pub fn new(method: Method, uri: Uri) -> Self {
        let uri = Arc::new(uri);
        let mut parts = Parts::new();
        parts.headers.set("host", host_header(&uri));
        Request { parts, method, target: None, uri }
    }

    /// Convenience constructor validating both the method token and the
    /// URI text.
    pub fn parse(method: &str, uri: &str) -> Result<Self> {
        Ok(Self::new(Method::new(method)?, Uri::parse(uri)?))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a new request with the given method.
    pub fn with_method(&self, method: Method) -> Self {
        let mut that = self.clone();
        that.method = method;
        that
    }

    /// The request target: the explicitly set one when non-empty, else
    /// `path[?query]` derived from the URI, else `/`.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.target
            && !target.is_empty()
        {
            return target.clone();
        }

        let mut target = self.uri.path().to_owned();
        if !self.uri.query().is_empty() {
            target.push('?');
            target.push_str(self.uri.query());
        }
        if target.is_empty() { "/".to_owned() } else { target }
    }

    /// Returns a new request with an explicit request target. The target
    /// is taken verbatim.
    pub fn with_request_target(&self, target: &str) -> Self {
        let mut that = self.clone();
        that.target = Some(target.to_owned());
        that
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns a new request holding `uri`.
    ///
    /// The `Host` header is re-synthesized from the new URI unless
    /// `preserve_host` is set and a `Host` header already exists.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut that = self.clone();
        that.uri = Arc::new(uri);

        if preserve_host && that.has_header("Host") {
            return that;
        }
        let host = host_header(&that.uri);
        that.parts.headers.set("Host", host);
        that
    }
}

/// `host[:port]` for the synthesized `Host` header; empty when the URI
/// has no host.
fn host_header(uri: &Uri) -> String {
    let mut host = uri.host().to_owned();
    if !host.is_empty()
        && let Some(port) = uri.port()
    {
        host.push(':');
        host.push_str(&port.to_string());
    }
    host
}

impl fmt::Display for Request {
    /// The wire text form: request line, header lines in insertion order
    /// with display-cased names (`Cookie` values joined with `"; "`,
    /// everything else with `", "`), a blank line, then the body.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/{}\r\n", self.method, self.request_target(), self.protocol_version())?;
        for (name, values) in self.headers() {
            let separator = if name == "cookie" { "; " } else { ", " };
            write!(f, "{}: {}\r\n", Headers::display_name(name), values.join(separator))?;
        }
        write!(f, "\r\n{}", self.body())
    }
}
