//! # Incremental parser for poller output.
//!
//! A polling executable writes detection records to stdout, but the pipe
//! delivers arbitrary chunks: a single read may contain many records, half a
//! record, or a record split across two reads. [`OutputParser`] accumulates
//! chunks and yields only **complete** records, keeping the partial tail
//! buffered for the next chunk.
//!
//! ## Rules
//! - The buffer holds exactly the unconsumed tail of process output.
//! - Partial data is never dropped; partial records are never emitted.
//! - Record grammar is configurable via [`RecordFormat`]; the default treats
//!   every non-empty line as one record identifier.

use std::borrow::Cow;
use std::sync::Arc;

/// Record grammar for poller output.
///
/// ## Field semantics
/// - `delimiter`: byte terminating one record (default `\n`)
/// - `prefix`: when set, only lines starting with it (after trimming) yield
///   records, and the identifier is the trimmed remainder. Lines without the
///   prefix are ignored, since pollers print banners and status noise
///   alongside detections.
///
/// # Example
/// ```
/// use tagvisor::{OutputParser, RecordFormat};
///
/// let mut parser = OutputParser::new(RecordFormat::with_prefix("TAG:"));
/// let records = parser.push(b"libnfc banner\nTAG:AB12\n");
/// assert_eq!(records.len(), 1);
/// assert_eq!(&*records[0], "AB12");
/// ```
#[derive(Clone, Debug)]
pub struct RecordFormat {
    /// Byte that terminates one record.
    pub delimiter: u8,
    /// Optional record marker; non-matching lines are ignored.
    pub prefix: Option<Cow<'static, str>>,
}

impl RecordFormat {
    /// Newline-delimited records, every non-empty line is one identifier.
    pub fn lines() -> Self {
        Self {
            delimiter: b'\n',
            prefix: None,
        }
    }

    /// Newline-delimited records marked by `prefix`.
    pub fn with_prefix(prefix: impl Into<Cow<'static, str>>) -> Self {
        Self {
            delimiter: b'\n',
            prefix: Some(prefix.into()),
        }
    }

    /// Records terminated by an arbitrary delimiter byte.
    pub fn delimited(delimiter: u8) -> Self {
        Self {
            delimiter,
            prefix: None,
        }
    }
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self::lines()
    }
}

/// Accumulates output chunks and splits them into complete records.
pub struct OutputParser {
    format: RecordFormat,
    buf: Vec<u8>,
}

impl OutputParser {
    /// Creates a parser with the given record grammar.
    pub fn new(format: RecordFormat) -> Self {
        Self {
            format,
            buf: Vec::new(),
        }
    }

    /// Appends one output chunk and returns every record completed by it,
    /// in stream order.
    ///
    /// The unconsumed suffix (a partial trailing record) stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Arc<str>> {
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut consumed = 0;
        while let Some(pos) = self.buf[consumed..]
            .iter()
            .position(|&b| b == self.format.delimiter)
        {
            let line = &self.buf[consumed..consumed + pos];
            if let Some(record) = extract(&self.format, line) {
                records.push(record);
            }
            consumed += pos + 1;
        }
        self.buf.drain(..consumed);
        records
    }

    /// Number of buffered bytes not yet resolved into a complete record.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Discards any buffered partial record.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Maps one complete line to a record identifier, or `None` for noise.
fn extract(format: &RecordFormat, line: &[u8]) -> Option<Arc<str>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match &format.prefix {
        Some(prefix) => {
            let rest = text.strip_prefix(prefix.as_ref())?.trim();
            if rest.is_empty() {
                None
            } else {
                Some(Arc::from(rest))
            }
        }
        None => Some(Arc::from(text)),
    }
}
