/// HTTP request methods understood by the server.
///
/// Anything else on the request line, including valid HTTP verbs such as
/// `PUT` or `OPTIONS`, is rejected by the parser with 501 Not Implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a document
    GET,
    /// HEAD - Like GET but only reports the document size
    HEAD,
    /// POST - Store the request body as a document
    POST,
    /// DELETE - Remove a document
    DELETE,
}

/// Represents a parsed HTTP request from a client.
///
/// A request lives for exactly one request/response cycle of a session.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// The raw request target as transmitted (no decoding, no normalization)
    pub path: String,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Request headers in arrival order; repeated names are all kept
    pub headers: Vec<(String, String)>,
    /// Whether the client asked for the connection to stay open
    pub keep_alive: bool,
    /// Request body (the stored document for POST)
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: Vec<(String, String)>,
    keep_alive: bool,
    body: Vec<u8>,
}

impl Method {
    /// Parses a method token from the request line.
    ///
    /// Matching is exact and case-sensitive.
    ///
    /// # Example
    ///
    /// ```
    /// # use warden::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// assert_eq!(Method::from_str("PUT"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "DELETE" => Some(Method::DELETE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            headers: Vec::new(),
            keep_alive: false,
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            keep_alive: self.keep_alive,
            body: self.body,
        })
    }
}

impl Request {
    /// Retrieves the first value of a header by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.header_values(key).next()
    }

    /// Every value sent under `key`, in arrival order.
    pub fn header_values<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> {
        header_values(&self.headers, key)
    }
}

pub(crate) fn header_values<'a>(
    headers: &'a [(String, String)],
    key: &str,
) -> impl Iterator<Item = &'a str> {
    headers
        .iter()
        .filter(move |(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.as_str())
}
