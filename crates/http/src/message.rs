//! The shared HTTP message surface.
//!
//! [`Parts`] holds what every message has: a protocol version, a header
//! map and an optional body. [`Message`] is the contract implemented by
//! [`crate::Request`], [`crate::Response`] and [`crate::ServerRequest`];
//! implementors only expose their `Parts` and inherit the whole
//! copy-on-write protocol from the provided methods.
//!
//! Every `with_*` method clones the receiver, mutates the clone and
//! returns it. The receiver is never observably changed, and container
//! fields are freshly owned by the clone, so no message holds a mutable
//! alias into another's internals. The one exception to plain field
//! replacement is [`Message::with_body`], which keeps `Content-Length`
//! and `Transfer-Encoding` in sync with the new body's size.

use crate::headers::{HeaderValues, Headers};
use crate::stream::Body;

/// The component parts common to all HTTP messages.
#[derive(Debug, Clone)]
pub struct Parts {
    pub(crate) version: String,
    pub(crate) headers: Headers,
    pub(crate) body: Option<Body>,
}

impl Parts {
    pub(crate) fn new() -> Self {
        Self { version: "1.1".to_owned(), headers: Headers::new(), body: None }
    }
}

impl Default for Parts {
    fn default() -> Self {
        Self::new()
    }
}

/// The immutable message contract shared by requests and responses.
pub trait Message: Clone {
    fn parts(&self) -> &Parts;

    fn parts_mut(&mut self) -> &mut Parts;

    /// The HTTP protocol version, e.g. `"1.1"`.
    fn protocol_version(&self) -> &str {
        &self.parts().version
    }

    /// Returns a new message with the given protocol version.
    fn with_protocol_version(&self, version: &str) -> Self {
        let mut that = self.clone();
        that.parts_mut().version = version.to_owned();
        that
    }

    /// The raw header map; stored names are lowercase.
    fn headers(&self) -> &Headers {
        &self.parts().headers
    }

    /// A display copy of all headers with conventionally cased names
    /// (`Content-Type`), in insertion order. Purely a read-time
    /// transform.
    fn header_map(&self) -> Vec<(String, Vec<String>)> {
        self.headers().iter().map(|(name, values)| (Headers::display_name(name), values.to_vec())).collect()
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    /// All values for the header; empty when absent.
    fn header(&self, name: &str) -> &[String] {
        self.headers().get(name)
    }

    /// The header's values joined with `", "`; the empty string when
    /// absent.
    fn header_line(&self, name: &str) -> String {
        self.headers().line(name)
    }

    /// Returns a new message with all values for the header replaced.
    fn with_header(&self, name: &str, value: impl Into<HeaderValues>) -> Self {
        let mut that = self.clone();
        that.parts_mut().headers.set(name, value);
        that
    }

    /// Returns a new message with values appended to the header; for an
    /// absent header this behaves like [`Message::with_header`].
    fn with_added_header(&self, name: &str, value: impl Into<HeaderValues>) -> Self {
        let mut that = self.clone();
        that.parts_mut().headers.append(name, value);
        that
    }

    /// Returns a new message without the header; a no-op clone when the
    /// header is absent.
    fn without_header(&self, name: &str) -> Self {
        let mut that = self.clone();
        that.parts_mut().headers.remove(name);
        that
    }

    /// The message body. A message constructed without a body yields a
    /// fresh empty stream on each call.
    fn body(&self) -> Body {
        self.parts().body.clone().unwrap_or_default()
    }

    /// Returns a new message carrying `body`, with the framing headers
    /// synchronized to its size: a known size sets `Content-Length` and
    /// drops `Transfer-Encoding`, an unknown size sets
    /// `Transfer-Encoding: chunked` and drops `Content-Length`. The two
    /// headers are never both present nor both absent afterwards.
    fn with_body(&self, body: Body) -> Self {
        let mut that = self.clone();
        let size = body.size();
        {
            let headers = &mut that.parts_mut().headers;
            match size {
                Some(size) => {
                    headers.set("Content-Length", size.to_string());
                    headers.remove("Transfer-Encoding");
                }
                None => {
                    headers.set("Transfer-Encoding", "chunked");
                    headers.remove("Content-Length");
                }
            }
        }
        that.parts_mut().body = Some(body);
        that
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a minimal message to exercise the provided methods in isolation
    #[derive(Debug, Clone, Default)]
    struct Plain {
        parts: Parts,
    }

    impl Message for Plain {
        fn parts(&self) -> &Parts {
            &self.parts
        }

        fn parts_mut(&mut self) -> &mut Parts {
            &mut self.parts
        }
    }

    #[test]
    fn default_protocol_version_is_1_1() {
        assert_eq!(Plain::default().protocol_version(), "1.1");
        assert_eq!(Plain::default().with_protocol_version("1.0").protocol_version(), "1.0");
    }

    #[test]
    fn with_header_never_mutates_the_receiver() {
        let message = Plain::default().with_header("Accept", "text/html");
        let changed = message.with_header("accept", "application/json");

        assert_eq!(message.header("Accept"), ["text/html"]);
        assert_eq!(changed.header("Accept"), ["application/json"]);
    }

    #[test]
    fn header_lookup_ignores_name_case() {
        let message = Plain::default().with_header("X-Custom", vec!["a", "b"]);
        assert_eq!(message.header("x-custom"), message.header("X-CUSTOM"));
        assert_eq!(message.header_line("x-CUSTOM"), "a, b");
    }

    #[test]
    fn added_header_appends_or_creates() {
        let message = Plain::default().with_added_header("Accept", "text/html").with_added_header("ACCEPT", "text/plain");
        assert_eq!(message.header("accept"), ["text/html", "text/plain"]);
    }

    #[test]
    fn without_header_is_silent_on_absent() {
        let message = Plain::default().with_header("A", "1");
        assert!(!message.without_header("a").has_header("A"));
        assert_eq!(message.without_header("missing").header("A"), ["1"]);
    }

    #[test]
    fn header_map_is_display_cased() {
        let message = Plain::default().with_header("content-type", "text/html").with_header("x-request-id", "42");
        let map = message.header_map();
        assert_eq!(map[0].0, "Content-Type");
        assert_eq!(map[1].0, "X-Request-Id");
        // the stored names stay lowercase
        assert!(message.headers().iter().all(|(name, _)| name.chars().all(|c| !c.is_ascii_uppercase())));
    }

    #[test]
    fn with_body_sets_content_length_for_known_size() {
        let message = Plain::default().with_body(Body::from("abcd"));
        assert_eq!(message.header_line("Content-Length"), "4");
        assert!(!message.has_header("Transfer-Encoding"));
    }

    #[test]
    fn with_body_sets_chunked_for_unknown_size() {
        let message = Plain::default().with_header("Content-Length", "10").with_body(Body::empty());
        assert_eq!(message.header_line("Transfer-Encoding"), "chunked");
        assert!(!message.has_header("Content-Length"));
    }

    #[test]
    fn body_defaults_to_an_empty_stream() {
        let message = Plain::default();
        assert_eq!(message.body().size(), None);
        assert_eq!(message.body().to_string(), "");
    }
}
