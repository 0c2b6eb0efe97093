use crate::http::request::{header_values, Method, Request};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const VERSION_MARKER: &str = " HTTP/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The header terminator (or the declared body) has not fully arrived.
    Incomplete,
    /// The leading token is not GET, HEAD, POST or DELETE.
    UnrecognizedMethod,
    /// The request line has no target or no ` HTTP/` marker.
    MalformedRequestLine,
    InvalidContentLength,
}

/// Parses the first request in `buf`.
///
/// On success returns the request and the number of bytes it occupied;
/// anything after that belongs to the next request on the connection.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let head = &buf[..headers_end];
    let body_start = headers_end + HEADER_TERMINATOR.len();

    let line_end = find(head, b"\r\n").unwrap_or(head.len());
    let request_line = &head[..line_end];

    // Method token: everything up to the first space
    let token_end = request_line
        .iter()
        .position(|&b| b == b' ')
        .unwrap_or(request_line.len());
    let method = std::str::from_utf8(&request_line[..token_end])
        .ok()
        .and_then(Method::from_str)
        .ok_or(ParseError::UnrecognizedMethod)?;

    let request_line =
        std::str::from_utf8(request_line).map_err(|_| ParseError::MalformedRequestLine)?;
    let (path, version) = split_target(request_line, method)?;

    let headers = parse_headers(&head[line_end..]);
    let keep_alive = connection_keep_alive(&headers);

    let content_length = header_values(&headers, "Content-Length")
        .next()
        .map(|v| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength)
        })
        .transpose()?;

    let (body, consumed) = match content_length {
        Some(len) => {
            let end = body_start
                .checked_add(len)
                .ok_or(ParseError::InvalidContentLength)?;
            if buf.len() < end {
                return Err(ParseError::Incomplete);
            }
            (buf[body_start..end].to_vec(), end)
        }
        // Without a declared length a POST body is whatever followed the headers
        None if method == Method::POST => (buf[body_start..].to_vec(), buf.len()),
        None => (Vec::new(), body_start),
    };

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        keep_alive,
        body,
    };

    Ok((request, consumed))
}

/// Reports whether the header block of `buf` asks for keep-alive.
///
/// Only bytes before the first blank line count. Without a terminator, or
/// without a `Connection: keep-alive` token, the answer is close.
pub fn keep_alive_requested(buf: &[u8]) -> bool {
    let Some(headers_end) = find_headers_end(buf) else {
        return false;
    };
    let head = &buf[..headers_end];
    let line_end = find(head, b"\r\n").unwrap_or(head.len());
    connection_keep_alive(&parse_headers(&head[line_end..]))
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    find(buf, HEADER_TERMINATOR)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}

fn split_target(request_line: &str, method: Method) -> Result<(&str, &str), ParseError> {
    let rest = request_line
        .strip_prefix(method.as_str())
        .and_then(|r| r.strip_prefix(' '))
        .ok_or(ParseError::MalformedRequestLine)?;

    let marker = rest
        .find(VERSION_MARKER)
        .ok_or(ParseError::MalformedRequestLine)?;

    let path = &rest[..marker];
    if path.is_empty() {
        return Err(ParseError::MalformedRequestLine);
    }

    Ok((path, rest[marker + 1..].trim_end()))
}

fn parse_headers(block: &[u8]) -> Vec<(String, String)> {
    let mut headers = Vec::new();

    for line in block.split(|&b| b == b'\n') {
        let Ok(line) = std::str::from_utf8(line) else {
            continue;
        };
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    headers
}

/// Keep-alive wins if any `Connection` line carries the token.
fn connection_keep_alive(headers: &[(String, String)]) -> bool {
    header_values(headers, "Connection")
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("keep-alive"))
}
