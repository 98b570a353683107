//! Transcript buffer for the utterance being spoken.

/// Accumulates final recognition results between two sends, plus the most
/// recent interim (not yet final) text for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptAccumulator {
    buffer: String,
    interim: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a final result. A single separating space is inserted unless
    /// the buffer is empty or already ends in whitespace. Blank results are
    /// dropped.
    pub fn push_final(&mut self, text: &str) {
        let piece = text.trim();
        self.interim.clear();
        if piece.is_empty() {
            return;
        }
        if !self.buffer.is_empty() && !self.buffer.ends_with(char::is_whitespace) {
            self.buffer.push(' ');
        }
        self.buffer.push_str(piece);
    }

    /// Replace the interim text. Interim results never reach the buffer.
    pub fn set_interim(&mut self, text: &str) {
        self.interim.clear();
        self.interim.push_str(text);
    }

    /// Take the buffered utterance, leaving the accumulator empty.
    pub fn take(&mut self) -> String {
        self.interim.clear();
        std::mem::take(&mut self.buffer)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.interim.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// True when nothing but whitespace has been buffered.
    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}
