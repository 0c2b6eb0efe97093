use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = "warden";

/// Serializes a response: status line, `Server`, `Content-Length`,
/// `Connection`, remaining headers, blank line, body.
pub fn serialize_response(resp: &Response, keep_alive: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    let content_length = resp
        .header("Content-Length")
        .map(str::to_string)
        .unwrap_or_else(|| resp.body.len().to_string());
    let connection = if keep_alive { "keep-alive" } else { "close" };

    write_header(&mut buf, "Server", SERVER_NAME);
    write_header(&mut buf, "Content-Length", &content_length);
    write_header(&mut buf, "Connection", connection);

    for (k, v) in &resp.headers {
        if ["Server", "Content-Length", "Connection"]
            .iter()
            .any(|fixed| k.eq_ignore_ascii_case(fixed))
        {
            continue;
        }
        write_header(&mut buf, k, v);
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(&resp.body);

    buf
}

fn write_header(buf: &mut Vec<u8>, key: &str, value: &str) {
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response, keep_alive: bool) -> Self {
        Self {
            buffer: serialize_response(response, keep_alive),
            written: 0,
        }
    }

    /// Writes the remaining bytes and flushes the stream.
    ///
    /// Resumable: a call after a partial write continues where it stopped.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
