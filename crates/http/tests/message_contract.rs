//! End-to-end checks of the message contract through the public API:
//! URI component decomposition, the copy-on-write protocol across the
//! whole object graph, wire serialization and environment ingestion.

use std::collections::BTreeMap;

use serde_json::json;

use sans_http::{Body, Globals, Message, Method, Request, Response, ServerRequest, Uri};

#[test]
fn uri_decomposes_into_its_components() {
    let uri = Uri::parse("http://hostname:9090/path?arg=value#anchor").unwrap();

    assert_eq!(uri.scheme(), "http");
    assert_eq!(uri.host(), "hostname");
    assert_eq!(uri.port(), Some(9090));
    assert_eq!(uri.path(), "/path");
    assert_eq!(uri.query(), "arg=value");
    assert_eq!(uri.fragment(), "anchor");
    assert_eq!(uri.authority(), "hostname:9090");
}

#[test]
fn request_line_derives_from_the_uri() {
    let uri = Uri::parse("http://hostname:9090/path?arg=value#anchor").unwrap();
    let request = Request::new(Method::POST, uri);

    assert!(request.to_string().starts_with("POST /path?arg=value HTTP/1.1\r\n"));
}

#[test]
fn reason_phrase_defaults_from_the_status_table() {
    let response = Response::default();
    assert_eq!(response.with_status(404, "").unwrap().reason_phrase(), "Not Found");
    assert_eq!(response.with_status(401, "Not authorized").unwrap().reason_phrase(), "Not authorized");
}

#[test]
fn known_body_size_sets_content_length_only() {
    let response = Response::default().with_body(Body::from("abcd"));
    assert_eq!(response.header_line("Content-Length"), "4");
    assert!(!response.has_header("Transfer-Encoding"));

    // unknown size flips both headers the other way
    let chunked = response.with_body(Body::from(""));
    assert_eq!(chunked.header_line("Transfer-Encoding"), "chunked");
    assert!(!chunked.has_header("Content-Length"));
}

#[test]
fn collapsed_port_renders_without_port_and_with_rooted_path() {
    let uri = Uri::parse("http://hostname:9090?arg=value#anchor").unwrap();
    let collapsed = uri.with_port(Some(80)).unwrap();
    assert_eq!(collapsed.to_string(), "http://hostname/?arg=value#anchor");
}

#[test]
fn header_lookup_ignores_name_case() {
    let request = Request::parse("GET", "http://example.com/").unwrap().with_header("Content-Type", "text/html");

    assert_eq!(request.header("content-type"), request.header("CONTENT-TYPE"));
    assert_eq!(request.header_line("cOnTeNt-TyPe"), "text/html");
}

#[test]
fn with_methods_never_touch_the_receiver() {
    let request = Request::parse("GET", "http://example.com/").unwrap();
    let tagged = request.with_header("X-Request-Id", "abc-123");

    assert!(!request.has_header("X-Request-Id"));
    assert_eq!(tagged.header_line("X-Request-Id"), "abc-123");

    let uri = request.uri().clone();
    let moved = request.with_uri(uri.with_path("/other").unwrap(), false);
    assert_eq!(request.uri().path(), "/");
    assert_eq!(moved.uri().path(), "/other");
}

#[test]
fn reencoding_an_encoded_uri_is_a_no_op() {
    let text = "http://example.com/a%20b/c%2Fd?q=%26escaped";
    let uri = Uri::parse(text).unwrap();
    assert_eq!(uri.to_string(), text);

    let again = uri.with_path(uri.path()).unwrap().with_query(uri.query()).unwrap();
    assert_eq!(again.to_string(), text);
}

#[test]
fn nested_upload_descriptors_normalize_into_a_tree() {
    let mut globals = Globals::new();
    globals
        .set_server("REQUEST_METHOD", "POST")
        .set_server("SERVER_PROTOCOL", "HTTP/1.1")
        .set_server("SERVER_NAME", "example.com")
        .set_server("HTTP_HOST", "example.com")
        .set_server("REQUEST_URI", "/profile");
    globals.files = json!({
        "form_name": {
            "tmp_name": {"details": {"photo": "/tmp/upl3Kd9Zr"}},
            "size": {"details": {"photo": 21212}},
            "error": {"details": {"photo": 0}},
            "name": {"details": {"photo": "photo.jpg"}},
            "type": {"details": {"photo": "image/jpeg"}},
        },
    })
    .as_object()
    .cloned()
    .unwrap();

    let request = ServerRequest::from_globals(&globals).unwrap();
    let photo = request.uploaded_files()["form_name"].get("details").unwrap().get("photo").unwrap().leaf().unwrap();

    assert_eq!(photo.client_filename(), Some("photo.jpg"));
    assert_eq!(photo.size(), Some(21212));
}

#[test]
fn server_request_round_trips_the_environment() {
    let mut globals = Globals::new();
    globals
        .set_server("REQUEST_METHOD", "GET")
        .set_server("SERVER_PROTOCOL", "HTTP/1.1")
        .set_server("HTTPS", "on")
        .set_server("SERVER_NAME", "shop.example.com")
        .set_server("SERVER_PORT", "443")
        .set_server("REQUEST_URI", "/cart?promo=spring")
        .set_server("QUERY_STRING", "promo=spring")
        .set_server("HTTP_HOST", "shop.example.com")
        .set_server("HTTP_ACCEPT", "text/html, application/json");
    globals.query.insert("promo".to_owned(), "spring".to_owned());
    globals.cookies.insert("session".to_owned(), "s3cr3t".to_owned());

    let request = ServerRequest::from_globals(&globals).unwrap();

    assert_eq!(request.method(), &Method::GET);
    assert_eq!(request.uri().to_string(), "https://shop.example.com/cart?promo=spring");
    assert_eq!(request.header("Accept"), ["text/html", "application/json"]);
    assert_eq!(request.cookie_params().get("session").map(String::as_str), Some("s3cr3t"));
    assert_eq!(request.query_params().get("promo").map(String::as_str), Some("spring"));

    let routed = request.with_attribute("route", "cart.show");
    assert_eq!(request.attribute("route"), None);
    assert_eq!(routed.attribute("route"), Some(&json!("cart.show")));
}

#[test]
fn server_request_defaults_without_an_environment() {
    let request =
        ServerRequest::new(Method::GET, Uri::parse("http://localhost/").unwrap(), BTreeMap::new());

    assert_eq!(request.protocol_version(), "1.1");
    assert_eq!(request.request_target(), "/");
    assert!(request.parsed_body().is_absent());
    assert!(request.uploaded_files().is_empty());
    assert!(request.server_params().is_empty());
}
