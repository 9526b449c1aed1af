// ============================================================================
// arena-core/src/bridge/protocol.rs
// ============================================================================
//
// ENGINE WIRE PROTOCOL: Line buffering and message decoding
//
// The engine writes newline-delimited text to stdout. Lines that start with
// `{` and decode as a tagged JSON message are progress updates or the final
// result; every other line is opaque log text passed through for display.
//
// KEY COMPONENTS:
// - ProgressEvent: the typed event stream handed to consumers
// - WireMessage: serde model of the JSON messages
// - StreamDecoder: byte-level line buffer that survives arbitrary chunking

use log::debug;
use serde::Deserialize;
use serde_json::Value;

/// A unit of information extracted from the engine's output.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Progress for one pipeline stage. `progress` is passed through
    /// unclamped; the tracker clamps it.
    Progress {
        stage: String,
        progress: f64,
        message: String,
    },
    /// The engine's final structured output.
    Result(Value),
    /// A chunk of stderr text, verbatim.
    Error(String),
    /// Unparsed stdout text for pass-through display.
    RawLine(String),
}

/// JSON messages understood on the engine's stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireMessage {
    Progress {
        stage: String,
        progress: f64,
        message: String,
    },
    Result {
        data: Value,
    },
}

/// Decodes one complete line (without its newline).
///
/// Lines that look like JSON but fail to decode, or carry an unknown `type`,
/// are treated as raw text rather than errors.
pub fn parse_line(line: &str) -> ProgressEvent {
    if line.trim_start().starts_with('{') {
        match serde_json::from_str::<WireMessage>(line) {
            Ok(WireMessage::Progress {
                stage,
                progress,
                message,
            }) => {
                return ProgressEvent::Progress {
                    stage,
                    progress,
                    message,
                };
            }
            Ok(WireMessage::Result { data }) => return ProgressEvent::Result(data),
            Err(e) => debug!("Treating JSON-like engine output as text: {e}"),
        }
    }
    ProgressEvent::RawLine(line.to_string())
}

/// Incremental decoder for the engine's stdout.
///
/// Bytes are buffered until a newline completes a line. Buffering happens on
/// raw bytes, so a chunk boundary inside a multi-byte character is harmless.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the events for every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let mut line = &self.pending[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            events.push(parse_line(&String::from_utf8_lossy(line)));
            start = end + 1;
        }
        self.pending.drain(..start);
        events
    }

    /// Ends the stream, discarding any unterminated tail.
    ///
    /// Returns the discarded fragment so callers can log it.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        debug!("Discarding unterminated engine output: {tail:?}");
        Some(tail)
    }

    /// Bytes held while waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYLOAD: &str = concat!(
        "Starting engine\n",
        "{\"type\":\"progress\",\"stage\":\"Loading\",\"progress\":0,\"message\":\"Reading video file...\"}\n",
        "{\"type\":\"progress\",\"stage\":\"Loading\",\"progress\":100,\"message\":\"Video loaded: talk.mp4\"}\n",
        "{not json at all}\n",
        "{\"type\":\"progress\",\"stage\":\"Transcription\",\"progress\":42.5,\"message\":\"Transcribing — ünïcode\"}\r\n",
        "\n",
        "{\"type\":\"result\",\"data\":{\"clips\":[{\"title\":\"x\"}],\"success\":true}}\n",
    );

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<ProgressEvent> {
        let mut decoder = StreamDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.feed(chunk));
        }
        assert_eq!(decoder.finish(), None);
        events
    }

    #[test]
    fn test_every_two_way_split_matches_single_chunk() {
        let bytes = PAYLOAD.as_bytes();
        let expected = decode_chunks(&[bytes]);
        assert_eq!(expected.len(), 7);

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_chunks(&[a, b]), expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time_matches_single_chunk() {
        let bytes = PAYLOAD.as_bytes();
        let expected = decode_chunks(&[bytes]);
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_chunks(&singles), expected);

        let threes: Vec<&[u8]> = bytes.chunks(3).collect();
        assert_eq!(decode_chunks(&threes), expected);
    }

    #[test]
    fn test_progress_split_at_offset_20() {
        let line = b"{\"type\":\"progress\",\"stage\":\"transcription\",\"progress\":50,\"message\":\"halfway\"}\n";
        let mut decoder = StreamDecoder::new();

        assert!(decoder.feed(&line[..20]).is_empty());
        assert_eq!(decoder.pending_len(), 20);

        let events = decoder.feed(&line[20..]);
        assert_eq!(
            events,
            vec![ProgressEvent::Progress {
                stage: "transcription".to_string(),
                progress: 50.0,
                message: "halfway".to_string(),
            }]
        );
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_unterminated_tail_is_discarded_not_parsed() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"{\"type\":\"result\",\"data\":{}}");
        assert!(events.is_empty());
        assert_eq!(
            decoder.finish().as_deref(),
            Some("{\"type\":\"result\",\"data\":{}}")
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(
            parse_line("{\"type\":\"result\",\"data\":{\"clips\":[{\"title\":\"x\"}]}}"),
            ProgressEvent::Result(json!({"clips": [{"title": "x"}]}))
        );
        assert_eq!(
            parse_line("plain log text"),
            ProgressEvent::RawLine("plain log text".to_string())
        );
        // Unknown discriminator and missing fields fall back to text.
        assert!(matches!(
            parse_line("{\"type\":\"heartbeat\"}"),
            ProgressEvent::RawLine(_)
        ));
        assert!(matches!(
            parse_line("{\"type\":\"progress\",\"stage\":\"x\"}"),
            ProgressEvent::RawLine(_)
        ));
        // Out-of-range progress passes through untouched.
        assert_eq!(
            parse_line("{\"type\":\"progress\",\"stage\":\"s\",\"progress\":140,\"message\":\"\"}"),
            ProgressEvent::Progress {
                stage: "s".to_string(),
                progress: 140.0,
                message: String::new(),
            }
        );
    }
}
