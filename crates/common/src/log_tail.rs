//! Bounded diagnostic log for the debug panel.

/// Characters kept by default.
pub const DEFAULT_LOG_TAIL_CHARS: usize = 1000;

/// Keeps the most recent characters of a free-text diagnostic log.
#[derive(Debug, Clone)]
pub struct LogTail {
    buffer: String,
    capacity: usize,
}

impl Default for LogTail {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_TAIL_CHARS)
    }
}

impl LogTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity + 128),
            capacity,
        }
    }

    /// Append one line and drop the oldest characters beyond capacity.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        tracing::debug!(target: "rampcut::log", "{line}");

        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);

        let len = self.buffer.chars().count();
        if len > self.capacity {
            let excess = len - self.capacity;
            let cut = self
                .buffer
                .char_indices()
                .nth(excess)
                .map(|(idx, _)| idx)
                .unwrap_or(self.buffer.len());
            self.buffer.drain(..cut);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
