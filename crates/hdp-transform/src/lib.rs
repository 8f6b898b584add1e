//! HDP Transform Library
//!
//! The transform stage of the health data pipeline: takes the most recent
//! raw WHO life expectancy snapshot from the staging object store, verifies
//! it is fit for use, normalizes it into the canonical warehouse schema, and
//! bulk-loads it into PostgreSQL via the COPY protocol.
//!
//! One run is a single, all-or-nothing pass over exactly one raw batch:
//!
//! ```text
//! staging fetch -> format sniff -> parse -> both-sexes filter
//!     -> quality gate -> normalize -> COPY (one transaction)
//! ```
//!
//! Failure at any stage aborts the run without a partial warehouse write.
//! See [`pipeline::run`] for the orchestration entry point.

pub mod config;
pub mod error;
pub mod format;
pub mod load;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod quality;
pub mod staging;

// Re-export commonly used types
pub use error::{QualityKind, Result, TransformError};
pub use format::{RawBatch, SourceFormat};
pub use normalize::{CanonicalRecord, SexCategory};
pub use parse::ParsedRecord;
