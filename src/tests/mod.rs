//! Router-level and cross-module tests for dirwarden.
//!
//! - **api_tests**: every endpoint driven through the full router and middleware stack
//! - **config_tests**: embedded defaults and configuration validation
//! - **error_tests**: status codes and the JSON error envelope

mod config_tests;
mod error_tests;
