use crate::note_elem::cursor::Cursor;
use crate::note_elem::tree::elem::*;
use crate::note_elem::tree::n_node;

/// The inline-token producer: yields one inline node per call until end of line, end of stream,
/// or a caller-supplied stop character.
///
/// Every recognizer here either commits a well-formed node or restores the cursor and lets the
/// offending characters flow into an ordinary text run; inline syntax is never an error.
pub(crate) struct InlineParser<'c, 'a> {
    cursor: &'c mut Cursor<'a>,
}

impl<'c, 'a> InlineParser<'c, 'a> {
    pub fn new(cursor: &'c mut Cursor<'a>) -> Self {
        Self { cursor }
    }

    /// The next inline node, or `None` at end of line, end of stream, or `stop`.
    pub fn next_inline(&mut self, stop: Option<char>) -> Option<Inline> {
        let ch = self.cursor.current()?;
        if matches!(ch, '\n' | '\r') || Some(ch) == stop {
            return None;
        }
        if matches!(ch, ' ' | '\t') {
            return Some(self.parse_space());
        }
        if let Some(inline) = self.try_construct(ch, stop) {
            return Some(inline);
        }
        Some(self.parse_text(stop))
    }

    /// Parse a `{...}` attribute list if the cursor is on one, else return the empty set and
    /// leave the cursor untouched. `allow_empty` controls whether a bare `{}` counts as a list.
    pub fn parse_attribute_list(&mut self, allow_empty: bool) -> AttrList {
        if self.cursor.current() != Some('{') {
            return AttrList::default();
        }
        let saved = self.cursor.save();
        self.cursor.advance();

        let mut attrs = Vec::new();
        loop {
            while matches!(self.cursor.current(), Some(' ') | Some('\t')) {
                self.cursor.advance();
            }
            match self.cursor.current() {
                Some('}') => {
                    self.cursor.advance();
                    break;
                }
                None | Some('\n') | Some('\r') => {
                    // Unterminated; not an attribute list after all.
                    self.cursor.restore(saved);
                    return AttrList::default();
                }
                Some(_) => {
                    let mut name = String::new();
                    while let Some(c) = self.cursor.current() {
                        if matches!(c, ' ' | '\t' | '}' | '=' | '\n' | '\r') {
                            break;
                        }
                        name.push(c);
                        self.cursor.advance();
                    }
                    let value = if self.cursor.eat('=') {
                        let mut value = String::new();
                        while let Some(c) = self.cursor.current() {
                            if matches!(c, ' ' | '\t' | '}' | '\n' | '\r') {
                                break;
                            }
                            value.push(c);
                            self.cursor.advance();
                        }
                        Some(value)
                    } else {
                        None
                    };
                    attrs.push(Attr { name, value });
                }
            }
        }

        if attrs.is_empty() && !allow_empty {
            self.cursor.restore(saved);
            return AttrList::default();
        }
        attrs.into_iter().collect()
    }

    fn parse_space(&mut self) -> Inline {
        let mut count = 0;
        while matches!(self.cursor.current(), Some(' ') | Some('\t')) {
            count += 1;
            self.cursor.advance();
        }
        n_node!(Inline::Space { count })
    }

    fn parse_text(&mut self, stop: Option<char>) -> Inline {
        let mut value = String::new();
        // Unconditionally take the first character: it may be a construct starter that just
        // failed to parse, and skipping it here is what guarantees forward progress.
        if let Some(ch) = self.cursor.current() {
            value.push(ch);
            self.cursor.advance();
        }
        while let Some(ch) = self.cursor.current() {
            if matches!(ch, '\n' | '\r' | ' ' | '\t') || Some(ch) == stop || starts_construct(ch) {
                break;
            }
            value.push(ch);
            self.cursor.advance();
        }
        n_node!(Inline::Text { value })
    }

    fn try_construct(&mut self, ch: char, stop: Option<char>) -> Option<Inline> {
        match ch {
            '`' => self.try_literal(),
            '[' => match self.cursor.peek(1) {
                Some('[') => self.try_link(),
                Some('^') => self.try_bracket_name('^').map(|label| n_node!(Inline::Footnote { label })),
                Some('#') => self.try_bracket_name('#').map(|name| n_node!(Inline::Mark { name })),
                Some('@') => self.try_bracket_name('@').map(|key| n_node!(Inline::Citation { key })),
                _ => None,
            },
            '{' => match self.cursor.peek(1) {
                Some('{') => self.try_image(),
                Some('~') => self.try_edit(),
                _ => None,
            },
            '#' => self.try_tag(),
            '*' | '/' | '_' | '~' => self.try_format(ch, stop),
            _ => None,
        }
    }

    fn try_literal(&mut self) -> Option<Inline> {
        let saved = self.cursor.save();
        self.cursor.advance();
        let mut value = String::new();
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some('`') => {
                    self.cursor.advance();
                    return Some(n_node!(Inline::Literal { value }));
                }
                Some(c) => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// `[[target]]` or `[[target|display]]`.
    fn try_link(&mut self) -> Option<Inline> {
        let saved = self.cursor.save();
        self.cursor.advance();
        self.cursor.advance();

        let mut target = String::new();
        let display = loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some(']') if self.cursor.peek(1) == Some(']') => break Vec::new(),
                Some('|') => {
                    self.cursor.advance();
                    let mut display = Vec::new();
                    while let Some(inline) = self.next_inline(Some(']')) {
                        display.push(inline);
                    }
                    if self.cursor.current() != Some(']') || self.cursor.peek(1) != Some(']') {
                        self.cursor.restore(saved);
                        return None;
                    }
                    break display;
                }
                Some(c) => {
                    target.push(c);
                    self.cursor.advance();
                }
            }
        };
        self.cursor.advance();
        self.cursor.advance();
        Some(n_node!(Inline::Link { target, display }))
    }

    /// `[^label]`, `[#name]`, `[@key]` — one-character sigil, then a name up to `]`.
    fn try_bracket_name(&mut self, sigil: char) -> Option<String> {
        let saved = self.cursor.save();
        self.cursor.advance();
        let ate = self.cursor.eat(sigil);
        debug_assert!(ate);
        let mut name = String::new();
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some(']') => {
                    self.cursor.advance();
                    return Some(name);
                }
                Some(c) => {
                    name.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// `{{src}}` or `{{src|alt}}`; a `data:` src becomes an embedded blob.
    fn try_image(&mut self) -> Option<Inline> {
        let saved = self.cursor.save();
        self.cursor.advance();
        self.cursor.advance();

        let mut src = String::new();
        let mut alt = String::new();
        let mut in_alt = false;
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some('}') if self.cursor.peek(1) == Some('}') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    break;
                }
                Some('|') if !in_alt => {
                    in_alt = true;
                    self.cursor.advance();
                }
                Some(c) => {
                    if in_alt {
                        alt.push(c);
                    } else {
                        src.push(c);
                    }
                    self.cursor.advance();
                }
            }
        }

        if let Some(blob) = parse_data_url(&src) {
            return Some(Inline::Blob(blob));
        }
        Some(n_node!(Inline::Image { src, alt }))
    }

    /// `{~old~>new~}`: a tracked delete + insert pair.
    fn try_edit(&mut self) -> Option<Inline> {
        let saved = self.cursor.save();
        self.cursor.advance();
        self.cursor.advance();

        let mut old = String::new();
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some('~') if self.cursor.peek(1) == Some('>') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    break;
                }
                Some(c) => {
                    old.push(c);
                    self.cursor.advance();
                }
            }
        }
        let mut new = String::new();
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some('~') if self.cursor.peek(1) == Some('}') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    break;
                }
                Some(c) => {
                    new.push(c);
                    self.cursor.advance();
                }
            }
        }

        let text_or_empty = |value: String| {
            if value.is_empty() {
                Vec::new()
            } else {
                vec![n_node!(Inline::Text { value })]
            }
        };
        Some(n_node!(Inline::Edit {
            delete: text_or_empty(old),
            insert: text_or_empty(new),
        }))
    }

    /// `#word` hashtags.
    fn try_tag(&mut self) -> Option<Inline> {
        if !self.cursor.peek(1).is_some_and(is_tag_char) {
            return None;
        }
        self.cursor.advance();
        let mut name = String::new();
        while let Some(c) = self.cursor.current() {
            if !is_tag_char(c) {
                break;
            }
            name.push(c);
            self.cursor.advance();
        }
        Some(n_node!(Inline::Tag { name }))
    }

    /// `**bold**`, `//italic//`, `__underline__`, `~~strike~~`, each optionally followed by an
    /// attribute list. Bold and italic written without one carry the default-styling marker.
    fn try_format(&mut self, delim: char, stop: Option<char>) -> Option<Inline> {
        if self.cursor.peek(1) != Some(delim) {
            return None;
        }
        let saved = self.cursor.save();
        self.cursor.advance();
        self.cursor.advance();

        let mut children = Vec::new();
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => {
                    self.cursor.restore(saved);
                    return None;
                }
                Some(c) if c == delim && self.cursor.peek(1) == Some(delim) => {
                    self.cursor.advance();
                    self.cursor.advance();
                    break;
                }
                Some(_) => match self.next_inline(stop) {
                    Some(inline) => children.push(inline),
                    None => {
                        // Hit the caller's stop character before the span closed.
                        self.cursor.restore(saved);
                        return None;
                    }
                },
            }
        }

        let kind = match delim {
            '*' => FormatKind::Bold,
            '/' => FormatKind::Italic,
            '_' => FormatKind::Underline,
            _ => FormatKind::Strike,
        };
        let mut attrs = self.parse_attribute_list(false);
        if attrs.is_empty() && matches!(kind, FormatKind::Bold | FormatKind::Italic) {
            attrs.push(Attr {
                name: Format::DEFAULT_ATTR.to_string(),
                value: None,
            });
        }
        Some(n_node!(Inline::Format { kind, attrs, children }))
    }
}

/// Whether a character can begin an inline construct, and therefore ends a text run.
fn starts_construct(ch: char) -> bool {
    matches!(ch, '`' | '[' | '{' | '#' | '*' | '/' | '_' | '~')
}

fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '-' | '_')
}

/// Split a `data:<media-type>;base64,<payload>` URL, keeping the payload encoded.
fn parse_data_url(src: &str) -> Option<Blob> {
    let rest = src.strip_prefix("data:")?;
    let (media_type, payload) = rest.split_once(";base64,")?;
    Some(Blob {
        media_type: media_type.to_string(),
        payload: payload.to_string(),
    })
}
