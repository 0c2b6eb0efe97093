//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.1 subset: four methods, `Content-Length`
//! framing, keep-alive via the `Connection` header.
//!
//! # Architecture
//!
//! - **`connection`**: Session state machine run by a worker for one client
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: Content-Type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a complete request
//!        └──────┬──────┘
//!               │ Request received (or rejected: 400/413/501)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route to the verb handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send and flush the response
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
