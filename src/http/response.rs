/// Body sent with 404 responses that carry one.
pub const NOT_FOUND_NOTICE: &str = "Document was not found!";

/// Body sent with 501 responses.
pub const NOT_IMPLEMENTED_NOTICE: &str = "Method not implemented!";

/// Content type used whenever a handler does not choose one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// HTTP status codes produced by the server.
///
/// - `Ok` (200): Document returned
/// - `Created` (201): Document stored
/// - `NoContent` (204): Document deleted
/// - `BadRequest` (400): Malformed request line or target escaping the document root
/// - `NotFound` (404): Document absent or could not be removed
/// - `PayloadTooLarge` (413): Request exceeded the configured size limit
/// - `InternalServerError` (500): Document could not be stored
/// - `NotImplemented` (501): Method other than GET, HEAD, POST, DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use warden::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }
}

/// A complete HTTP response ready to be sent to a client.
///
/// Headers keep their insertion order. `Server` and `Connection` are not
/// stored here; the writer adds them when the response is serialized.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use warden::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body(b"<p>hi</p>".to_vec())
///     .build();
/// assert_eq!(response.header("Content-Length"), Some("9"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header (names compare case-insensitively).
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();

        match self
            .headers
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Declares a Content-Length that differs from the body, as HEAD does.
    pub fn content_length(self, len: u64) -> Self {
        self.header("Content-Length", len.to_string())
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response.
    ///
    /// Content-Length defaults to the body size and Content-Type to
    /// `text/plain` unless they were set explicitly.
    pub fn build(mut self) -> Response {
        if !self.has_header("Content-Length") {
            let len = self.body.len().to_string();
            self.headers.insert(0, ("Content-Length".to_string(), len));
        }
        if !self.has_header("Content-Type") {
            self.headers
                .push(("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string()));
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }

    fn has_header(&self, key: &str) -> bool {
        self.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(key))
    }
}

impl Response {
    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Creates a 404 Not Found response carrying the not-found notice.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .body(NOT_FOUND_NOTICE)
            .build()
    }

    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .body("400 Bad Request")
            .build()
    }

    pub fn payload_too_large() -> Self {
        ResponseBuilder::new(StatusCode::PayloadTooLarge)
            .body("413 Payload Too Large")
            .build()
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .body("500 Internal Server Error")
            .build()
    }

    pub fn not_implemented() -> Self {
        ResponseBuilder::new(StatusCode::NotImplemented)
            .body(NOT_IMPLEMENTED_NOTICE)
            .build()
    }
}
