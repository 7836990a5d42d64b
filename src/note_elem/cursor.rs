/// A character cursor over a note's text, with save/restore for backtracking.
///
/// Positions are byte offsets into the original text. The cursor never allocates; callers that
/// need a raw slice (verbatim bodies) borrow directly from the input.
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

/// An opaque saved position. Only valid for the cursor that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct SavedPosition(usize);

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn is_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// The character under the cursor, or `None` at end of stream.
    pub fn current(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Peek `n` characters past the current one without consuming anything. `peek(0)` is
    /// equivalent to [`Cursor::current`].
    pub fn peek(&self, n: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(n)
    }

    pub fn advance(&mut self) {
        if let Some(ch) = self.current() {
            self.pos += ch.len_utf8();
        }
    }

    /// Consume the current character if it equals `ch`.
    pub fn eat(&mut self, ch: char) -> bool {
        if self.current() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    /// Number of consecutive occurrences of `ch` starting at the cursor, without consuming.
    pub fn run_len(&self, ch: char) -> usize {
        self.text[self.pos..].chars().take_while(|&c| c == ch).count()
    }

    pub fn save(&self) -> SavedPosition {
        SavedPosition(self.pos)
    }

    pub fn restore(&mut self, saved: SavedPosition) {
        self.pos = saved.0;
    }

    /// Whether the cursor sits on a line terminator (`\n` or `\r`).
    pub fn at_line_end(&self) -> bool {
        matches!(self.current(), Some('\n') | Some('\r'))
    }

    /// Consume a line terminator, handling both the one- and two-character conventions.
    pub fn consume_line_end(&mut self) -> bool {
        match self.current() {
            Some('\n') => {
                self.pos += 1;
                true
            }
            Some('\r') => {
                self.pos += 1;
                if self.current() == Some('\n') {
                    self.pos += 1;
                }
                true
            }
            _ => false,
        }
    }

    /// Advance to the current line's terminator (or end of stream), discarding the skipped text.
    pub fn skip_to_line_end(&mut self) {
        match memchr::memchr(b'\n', &self.text.as_bytes()[self.pos..]) {
            Some(idx) => {
                // Land on the '\r' of a "\r\n" so consume_line_end sees the full terminator.
                let mut end = self.pos + idx;
                if end > self.pos && self.text.as_bytes()[end - 1] == b'\r' {
                    end -= 1;
                }
                self.pos = end;
            }
            None => self.pos = self.text.len(),
        }
    }

    /// Take the rest of the current line as a raw slice, leaving the cursor on the terminator.
    /// The slice never includes the terminator (nor the '\r' of a "\r\n").
    pub fn take_rest_of_line(&mut self) -> &'a str {
        let start = self.pos;
        self.skip_to_line_end();
        &self.text[start..self.pos]
    }
}
