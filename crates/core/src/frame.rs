//! Line framing for the processing service's event stream.
//!
//! Bytes arrive in arbitrary chunks. Only complete `\n`-terminated lines are
//! decoded; whatever follows the last newline (including a split UTF-8
//! sequence) is carried over to the next [`FrameDecoder::feed`].

/// Prefix marking a data-bearing frame.
pub const DATA_PREFIX: &str = "data: ";

/// Incremental decoder that turns byte chunks into `data:` payloads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    bom_checked: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payloads of every data frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        // Only the first bytes of the stream may carry a BOM.
        if !self.bom_checked && (self.buffer.len() >= 3 || self.buffer.contains(&b'\n')) {
            self.bom_checked = true;
            if self.buffer.starts_with(&[0xEF, 0xBB, 0xBF]) {
                self.buffer.drain(..3);
            }
        }

        let mut payloads = Vec::new();
        let mut start = 0usize;
        while let Some(rel) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + rel;
            if let Some(payload) = data_payload(&self.buffer[start..end]) {
                payloads.push(payload);
            }
            start = end + 1;
        }
        if start > 0 {
            self.buffer.drain(..start);
        }
        payloads
    }

    /// Bytes buffered after the last newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Discard the unterminated remainder at end of stream, returning its size.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = String::from_utf8_lossy(line);
    text.strip_prefix(DATA_PREFIX).map(str::to_string)
}
