//! Outbound HTTP response representation.

use std::fmt;

use crate::error::{Result, ValidationError};
use crate::headers::Headers;
use crate::message::{Message, Parts};
use crate::utils::ensure;

/// An immutable HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    parts: Parts,
    status: u16,
    reason: String,
}

impl Message for Response {
    fn parts(&self) -> &Parts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut Parts {
        &mut self.parts
    }
}

impl Response {
    /// Creates a response with the given status code and its canonical
    /// reason phrase (empty for a code outside the table).
    ///
    /// Every new response carries two baseline security headers:
    /// `Content-Security-Policy` restricted to `'self'` and
    /// `X-Content-Type-Options: nosniff`.
    pub fn new(status: u16) -> Result<Self> {
        let status = filter_status_code(status)?;
        Ok(Self::build(status, String::new()))
    }

    fn build(status: u16, reason: String) -> Self {
        let reason = if reason.is_empty() {
            canonical_reason(status).unwrap_or_default().to_owned()
        } else {
            reason
        };

        let mut parts = Parts::new();
        parts
            .headers
            .append("Content-Security-Policy", "default-src 'self'; frame-ancestors 'self'; form-action 'self';");
        parts.headers.append("X-Content-Type-Options", "nosniff");

        Response { parts, status, reason }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Returns a new response with the given status code.
    ///
    /// An empty `reason` falls back to the canonical phrase; a code
    /// outside the table simply gets an empty phrase, which is not an
    /// error.
    pub fn with_status(&self, status: u16, reason: &str) -> Result<Self> {
        let mut that = self.clone();
        that.status = filter_status_code(status)?;
        that.reason = if reason.is_empty() {
            canonical_reason(that.status).unwrap_or_default().to_owned()
        } else {
            reason.to_owned()
        };
        Ok(that)
    }
}

impl Default for Response {
    /// A `200 OK` response.
    fn default() -> Self {
        Self::build(200, String::new())
    }
}

/// Rejects 306 (reserved, unused) and anything outside `100..=599`.
fn filter_status_code(status: u16) -> Result<u16> {
    ensure!(status != 306, ValidationError::UnusedStatusCode);
    ensure!((100..=599).contains(&status), ValidationError::StatusCodeOutOfRange);
    Ok(status)
}

/// The standard reason phrase for a status code.
pub fn canonical_reason(status: u16) -> Option<&'static str> {
    let reason = match status {
        // informational
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",
        // successful
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        226 => "IM Used",
        // redirection
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        // client error
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        // server error
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also Negotiates",
        507 => "Insufficient Storage",
        508 => "Loop Detected",
        510 => "Not Extended",
        511 => "Network Authentication Required",
        _ => return None,
    };
    Some(reason)
}

impl fmt::Display for Response {
    /// The wire text form: status line, header lines in insertion order
    /// with display-cased names (`Set-Cookie` emits one line per value,
    /// everything else joins with `", "`), a blank line, then the body.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{} {} {}\r\n", self.protocol_version(), self.status, self.reason)?;
        for (name, values) in self.headers() {
            let display = Headers::display_name(name);
            if name == "set-cookie" {
                for value in values {
                    write!(f, "{display}: {value}\r\n")?;
                }
            } else {
                write!(f, "{}: {}\r\n", display, values.join(", "))?;
            }
        }
        write!(f, "\r\n{}", self.body())
    }
}
