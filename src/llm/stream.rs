use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

/// Reassembles a server-sent completion stream (`data: {"content": .., "stop": ..}`
/// lines) from arbitrarily split network chunks. Lines that do not parse are
/// skipped.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    pending: Vec<u8>,
    text: String,
    finished: bool,
    skipped: usize,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.handle_line(&line);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[cfg(test)]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Flushes a trailing unterminated line and returns the text so far.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.handle_line(&rest);
        }
        if self.skipped > 0 {
            tracing::debug!("skipped {} malformed stream fragments", self.skipped);
        }
        self.text
    }

    fn handle_line(&mut self, raw: &[u8]) {
        if self.finished {
            return;
        }

        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(_) => {
                self.skipped += 1;
                return;
            }
        };
        if line.is_empty() || line.starts_with(':') {
            return;
        }

        let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
        if payload == "[DONE]" {
            self.finished = true;
            return;
        }

        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => {
                self.text.push_str(&chunk.content);
                if chunk.stop {
                    self.finished = true;
                }
            }
            Err(e) => {
                tracing::debug!("skipping stream fragment: {}", e);
                self.skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_until_stop() {
        let mut assembler = StreamAssembler::new();
        assembler.push(b"data: {\"content\":\"SELECT\",\"stop\":false}\n\n");
        assembler.push(b"data: {\"content\":\" 1;\",\"stop\":false}\n\n");
        assembler.push(b"data: {\"content\":\"\",\"stop\":true}\n\n");
        assert!(assembler.is_finished());
        assembler.push(b"data: {\"content\":\"ignored\",\"stop\":false}\n\n");

        assert_eq!(assembler.finish(), "SELECT 1;");
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let stream = b"data: {\"content\":\"Hel\",\"stop\":false}\n\ndata: {\"content\":\"lo\",\"stop\":false}\n\n";
        let mut assembler = StreamAssembler::new();
        for piece in stream.chunks(7) {
            assembler.push(piece);
        }
        assert_eq!(assembler.finish(), "Hello");
    }

    #[test]
    fn test_malformed_fragments_are_skipped() {
        let mut assembler = StreamAssembler::new();
        assembler.push(b"data: {\"content\":\"a\",\"stop\":false}\n");
        assembler.push(b"data: {not json\n");
        assembler.push(&[0xff, 0xfe, b'\n']);
        assembler.push(b": keep-alive\n");
        assembler.push(b"data: {\"content\":\"b\",\"stop\":false}\n");

        assert_eq!(assembler.skipped(), 2);
        assert_eq!(assembler.finish(), "ab");
    }

    #[test]
    fn test_trailing_line_without_newline() {
        let mut assembler = StreamAssembler::new();
        assembler.push(b"data: {\"content\":\"tail\",\"stop\":true}");
        assert!(!assembler.is_finished());
        assert_eq!(assembler.finish(), "tail");
    }
}
