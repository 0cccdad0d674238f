//! # dirwarden
//!
//! A small HTTP service that exposes one directory tree (the sandbox root)
//! to a browser client: directory listings, text previews, image and video
//! streaming, slideshow image lists and zip downloads of selected files.
//!
//! ## Architecture
//!
//! - **Axum** for routing and middleware, **tower-http** for file streaming
//!   (including `Range` requests), compression, CORS and request tracing
//! - **Tokio** runtime; blocking filesystem work runs on `spawn_blocking`
//! - **zip** + **tempfile** for the favorites archive
//!
//! ## Core Components
//!
//! - [`browser`]: path containment, metadata, listings, media checks, archives
//! - [`config`]: layered configuration (embedded defaults, file, environment)
//! - [`error`]: the JSON error envelope every handler returns
//! - [`middleware`]: request tracking, request validation, security headers
//! - [`routes`]: HTTP endpoint handlers and the router
//! - [`state`]: shared application state
//! - [`tracker`]: registry of in-flight requests

pub mod browser;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tracker;

#[cfg(test)]
mod tests;
