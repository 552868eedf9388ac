use radiobot_core::{TransportEvent, TransportEventKind};

use super::wire::NodeEvent;

/// Splits a server-sent event byte stream into the payloads of its `data:` lines.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl EventStreamParser {
    /// Feeds a chunk of the stream, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut completed = vec![];

        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();

            // Only whole lines are decoded, chunks may end inside a character
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    completed.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }

            // Comments are used as keep-alives
            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.trim_start().to_string());
            }
        }

        completed
    }
}

/// Parses an event payload, returning [None] for events the core does not care about.
pub fn parse_event(payload: &str) -> Option<TransportEvent> {
    let event: NodeEvent = serde_json::from_str(payload).ok()?;

    let event = match event {
        NodeEvent::TrackEnd {
            guild_id,
            connection_id,
            reason,
        } => TransportEvent {
            guild_id,
            connection_id,
            kind: TransportEventKind::TrackEnd {
                reason: reason.into(),
            },
        },
        NodeEvent::ConnectionClosed {
            guild_id,
            connection_id,
            code,
        } => TransportEvent {
            guild_id,
            connection_id,
            kind: TransportEventKind::ConnectionClosed { code },
        },
    };

    Some(event)
}

#[cfg(test)]
mod tests {
    use radiobot_core::TrackEndReason;

    use super::*;

    #[test]
    fn splits_events_across_chunks() {
        let mut parser = EventStreamParser::default();

        assert!(parser.push(b": keep-alive\n\ndata: {\"a\"").is_empty());
        assert_eq!(parser.push(b":1}\r\n\r\ndata: 2\n"), vec!["{\"a\":1}"]);
        assert_eq!(parser.push(b"data: 3\n\n"), vec!["2\n3"]);
    }

    #[test]
    fn keeps_characters_split_across_chunks() {
        let mut parser = EventStreamParser::default();
        let payload = "data: caf\u{e9} \u{1f4fb}\n\n".as_bytes();

        // Split inside the two byte é, then inside the four byte emoji
        assert!(parser.push(&payload[..10]).is_empty());
        assert!(parser.push(&payload[10..14]).is_empty());
        assert_eq!(parser.push(&payload[14..]), vec!["caf\u{e9} \u{1f4fb}"]);
    }

    #[test]
    fn converts_node_events() {
        let event = parse_event(
            r#"{"type":"trackEnd","guildId":"10","connectionId":2,"reason":"finished"}"#,
        );

        assert_eq!(
            event,
            Some(TransportEvent {
                guild_id: 10,
                connection_id: 2,
                kind: TransportEventKind::TrackEnd {
                    reason: TrackEndReason::Finished
                }
            })
        );

        let closed = parse_event(r#"{"type":"connectionClosed","guildId":10,"connectionId":2,"code":4014}"#);
        assert!(matches!(
            closed.map(|e| e.kind),
            Some(TransportEventKind::ConnectionClosed { code: Some(4014) })
        ));

        assert_eq!(parse_event(r#"{"type":"stats","players":3}"#), None);
    }
}
