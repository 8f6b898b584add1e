//! Raw payload format detection.
//!
//! The upstream feed is published in two wire formats: delimited text with a
//! header row, and an OData-style JSON envelope. Which one lands in staging
//! is not known in advance, so the first bytes of the payload decide which
//! parser branch runs.

use tracing::debug;

/// How many leading bytes the sniffer inspects.
const SNIFF_WINDOW: usize = 50;

/// Wire format of a raw batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with a header row (CSV).
    Tabular,
    /// JSON: a bare array of records, or an envelope with a `value` array.
    Structured,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Tabular => write!(f, "tabular"),
            SourceFormat::Structured => write!(f, "structured"),
        }
    }
}

/// One immutable raw snapshot as fetched from staging, tagged with its
/// detected format. Consumed once by the parser.
#[derive(Debug)]
pub struct RawBatch {
    /// Object key the payload was fetched from.
    pub key: String,
    pub bytes: Vec<u8>,
    pub format: SourceFormat,
}

/// Classify a payload by its first ~50 bytes: if the first non-whitespace
/// byte is `{`, it is [`SourceFormat::Structured`], otherwise
/// [`SourceFormat::Tabular`].
///
/// This is a heuristic, not a schema validator; malformed payloads are
/// caught at parse time.
pub fn detect(bytes: &[u8]) -> SourceFormat {
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let format = match window.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => SourceFormat::Structured,
        _ => SourceFormat::Tabular,
    };
    debug!("Detected {} payload", format);
    format
}
