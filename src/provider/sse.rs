//! Server-Sent Events (SSE) parser.
//!
//! Follows the SSE specification for parsing event streams from LLM APIs.

/// A parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// Event type (from `event:` line), if present.
    pub event: Option<String>,
    /// Event data (from `data:` line).
    pub data: String,
}

/// Incremental SSE parser.
///
/// Buffers partial data and emits complete events.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    /// Create a new SSE parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of data and return any complete events.
    ///
    /// SSE events are delimited by double newlines (`\n\n`).
    /// Each event can have:
    /// - `event: <type>` - optional event type
    /// - `data: <content>` - event data (required)
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        // Process complete events (delimited by \n\n)
        while let Some(pos) = self.buffer.find("\n\n") {
            let event_text = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + 2..].to_string();

            if let Some(event) = Self::parse_event(&event_text) {
                events.push(event);
            }
        }

        events
    }

    /// Parse a single SSE event from its text representation.
    fn parse_event(text: &str) -> Option<SseEvent> {
        let mut event_type = None;
        let mut data_parts = Vec::new();

        for line in text.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                event_type = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                data_parts.push(value.trim_start().to_string());
            } else if line.starts_with(':') {
                // Comment line, ignore
            }
        }

        if data_parts.is_empty() {
            return None;
        }

        // Join multiple data lines with newlines
        let data = data_parts.join("\n");

        Some(SseEvent {
            event: event_type,
            data,
        })
    }

    /// Clear the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Check if there's pending data in the buffer.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}
