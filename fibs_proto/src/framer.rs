/// An item produced by the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramedItem {
    /// A complete line, CR/LF stripped.
    Line(String),
    /// An unterminated login or registration prompt. FIBS never sends a
    /// newline after these, so they are matched against the tail of the
    /// buffer.
    Prompt(String),
}

/// The prompts FIBS emits without a line terminator. Longest first, so
/// a registration prompt is not mistaken for its `password: ` suffix.
const PROMPTS: &[&str] = &[
    "Please retype your password: ",
    "Please give your password: ",
    "login: ",
    "password: ",
];

/// Splits the server byte stream into lines.
///
/// Server output is LF-terminated with an optional preceding CR. Bytes
/// outside `{\n, \t, 0x20..0x7e}` are filtered before framing, which
/// strips telnet option negotiation and other control noise.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every item that became complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<FramedItem> {
        let mut items = Vec::new();
        for &b in bytes {
            match b {
                b'\n' => {
                    let mut line = std::mem::take(&mut self.buffer);
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    items.push(FramedItem::Line(line));
                }
                b'\t' | 0x20..=0x7e => {
                    self.buffer.push(b as char);
                    if let Some(prompt) = self.pending_prompt() {
                        self.buffer.clear();
                        items.push(FramedItem::Prompt(prompt));
                    }
                }
                _ => {}
            }
        }
        items
    }

    fn pending_prompt(&self) -> Option<String> {
        PROMPTS
            .iter()
            .find(|p| self.buffer.ends_with(*p))
            .map(|p| p.trim_end().to_string())
    }

    /// Discard any partial input, e.g. on reconnect.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
