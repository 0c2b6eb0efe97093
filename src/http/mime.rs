//! Content-Type lookup by file extension.

use std::path::Path;

/// Returns the Content-Type for a request target.
///
/// Only the extension of the final path component counts and it is compared
/// case-insensitively. A target without an extension is served as
/// `text/plain`; an unknown extension as `application/octet-stream`.
pub fn content_type_for(target: &str) -> &'static str {
    let Some(extension) = Path::new(target).extension().and_then(|e| e.to_str()) else {
        return "text/plain";
    };

    match extension.to_ascii_lowercase().as_str() {
        "txt" | "sed" | "awk" | "c" | "h" => "text/plain",
        "html" | "htm" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
