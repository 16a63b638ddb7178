//! Record framing for streamed responses.
//!
//! The server frames each record as `{separator}{json}{line feed}`. Records
//! are independent JSON objects; one bad record must not poison the rest.

use std::io::BufRead;

use serde_json::Value;
use tracing::warn;

use courier_core::config::StreamingConfig;

/// Separator pair negotiated with the server for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFraming {
    pub record_separator: String,
    pub line_feed: String,
}

impl StreamFraming {
    pub fn new(record_separator: impl Into<String>, line_feed: impl Into<String>) -> Self {
        Self {
            record_separator: record_separator.into(),
            line_feed: line_feed.into(),
        }
    }

    fn delimiter(&self) -> u8 {
        self.line_feed.as_bytes().first().copied().unwrap_or(b'\n')
    }

    /// Split a response stream into records, feeding each parsed one to
    /// `emit`. Malformed or undersized records are logged and skipped.
    pub fn read_records<R: BufRead>(
        &self,
        mut reader: R,
        mut emit: impl FnMut(Value),
    ) -> std::io::Result<()> {
        let delimiter = self.delimiter();
        let separator = self.record_separator.as_bytes();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(delimiter, &mut buf)? == 0 {
                break;
            }
            if buf.last() == Some(&delimiter) {
                buf.pop();
            }
            if buf.is_empty() {
                continue;
            }
            let record = match buf.strip_prefix(separator) {
                Some(rest) if !rest.is_empty() => rest,
                _ => {
                    warn!("edge: undersized streamed record skipped");
                    continue;
                }
            };
            match serde_json::from_slice::<Value>(record) {
                Ok(value) => emit(value),
                Err(e) => warn!("edge: malformed streamed record skipped: {e}"),
            }
        }
        Ok(())
    }
}

impl From<&StreamingConfig> for StreamFraming {
    fn from(config: &StreamingConfig) -> Self {
        Self::new(config.record_separator.clone(), config.line_feed.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(framing: &StreamFraming, body: &str) -> Vec<Value> {
        let mut records = Vec::new();
        framing
            .read_records(body.as_bytes(), |v| records.push(v))
            .unwrap();
        records
    }

    #[test]
    fn splits_framed_records() {
        let framing = StreamFraming::new("\u{0}", "\n");
        let body = "\u{0}{\"requestId\":\"a\"}\n\u{0}{\"requestId\":\"b\"}\n";
        let records = collect(&framing, body);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["requestId"], "a");
        assert_eq!(records[1]["requestId"], "b");
    }

    #[test]
    fn missing_trailing_line_feed_still_yields_last_record() {
        let framing = StreamFraming::new("\u{0}", "\n");
        let records = collect(&framing, "\u{0}{\"a\":1}\n\u{0}{\"b\":2}");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let framing = StreamFraming::new("\u{0}", "\n");
        let body = "\u{0}{\"ok\":1}\nno-separator\n\u{0}not json\n\u{0}\n\u{0}{\"ok\":2}\n";
        let records = collect(&framing, body);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["ok"], 1);
        assert_eq!(records[1]["ok"], 2);
    }

    #[test]
    fn empty_body_yields_nothing() {
        let framing = StreamFraming::new("\u{0}", "\n");
        assert!(collect(&framing, "").is_empty());
    }
}
