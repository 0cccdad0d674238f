//! Middleware components for HTTP request processing.
//!
//! Cross-cutting concerns layered around every route: request lifecycle
//! tracking, security headers, early request validation and client
//! identification.

pub mod ip;
pub mod security_headers;
pub mod tracking;
pub mod validation;
