//! HDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the HDP workspace members. Currently this is the
//! centralized logging setup; every binary in the workspace initializes its
//! tracing subscriber through [`logging::init_logging`] so that log level,
//! format, and output target are controlled the same way everywhere.

pub mod logging;
