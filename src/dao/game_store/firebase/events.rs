//! Incremental parser for the `text/event-stream` feed served by the realtime database.

/// Event kinds emitted by the realtime database streaming API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtdbEvent {
    /// `put` or `patch`: the watched location changed.
    Changed,
    /// Periodic heartbeat.
    KeepAlive,
    /// The server ended the stream; carries the reason sent by the server.
    Closed(String),
}

/// Raw event as framed by the stream (`event:` + `data:` lines up to a blank line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RawEvent {
    name: String,
    data: String,
}

impl RawEvent {
    fn classify(self) -> Option<RtdbEvent> {
        match self.name.as_str() {
            "put" | "patch" => Some(RtdbEvent::Changed),
            "keep-alive" => Some(RtdbEvent::KeepAlive),
            "cancel" => Some(RtdbEvent::Closed(non_empty(self.data, "cancelled"))),
            "auth_revoked" => Some(RtdbEvent::Closed(non_empty(self.data, "auth revoked"))),
            _ => None,
        }
    }
}

fn non_empty(data: String, fallback: &str) -> String {
    let trimmed = data.trim().trim_matches('"');
    if trimmed.is_empty() || trimmed == "null" {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Accumulates network chunks and yields complete events.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    pending: Vec<u8>,
    current: RawEvent,
}

impl EventStreamParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RtdbEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                let raw = std::mem::take(&mut self.current);
                if let Some(event) = raw.classify() {
                    events.push(event);
                }
                continue;
            }

            if let Some(name) = line.strip_prefix("event:") {
                self.current.name = name.trim().to_string();
            } else if let Some(data) = line.strip_prefix("data:") {
                if !self.current.data.is_empty() {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(data.trim_start());
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_put_and_keep_alive() {
        let mut parser = EventStreamParser::new();
        let events = parser.push(
            b"event: put\ndata: {\"path\":\"/\",\"data\":{}}\n\nevent: keep-alive\ndata: null\n\n",
        );
        assert_eq!(events, vec![RtdbEvent::Changed, RtdbEvent::KeepAlive]);
    }

    #[test]
    fn events_split_across_chunks_are_reassembled() {
        let mut parser = EventStreamParser::new();
        assert!(parser.push(b"event: pat").is_empty());
        assert!(parser.push(b"ch\r\ndata: {\"path\":\"/status\"").is_empty());
        assert_eq!(parser.push(b",\"data\":\"break\"}\r\n\r\n"), vec![RtdbEvent::Changed]);
    }

    #[test]
    fn cancel_carries_reason() {
        let mut parser = EventStreamParser::new();
        let events = parser.push(b"event: cancel\ndata: \"permission denied\"\n\n");
        assert_eq!(events, vec![RtdbEvent::Closed("permission denied".into())]);

        let events = parser.push(b"event: auth_revoked\ndata: null\n\n");
        assert_eq!(events, vec![RtdbEvent::Closed("auth revoked".into())]);
    }

    #[test]
    fn unknown_events_are_skipped() {
        let mut parser = EventStreamParser::new();
        assert!(parser.push(b"event: other\ndata: 1\n\n").is_empty());
    }
}
