use crate::note_elem::cursor::Cursor;
use crate::note_elem::inline_parse::InlineParser;
use crate::note_elem::tree::elem::*;
use crate::note_elem::tree::{n_node, Block, InvalidNote, NestingImbalance, ParseOptions};
use std::backtrace::Backtrace;

/// The recursive-descent block parser.
///
/// Dispatches on the first character of each line. A construct that fails its opening gate
/// restores the cursor to the line start and the line is reinterpreted as paragraph text; this
/// is the parser's only backtracking point. Once a construct commits, it always attaches a
/// well-formed node.
pub(crate) struct BlockParser<'c, 'a> {
    cursor: &'c mut Cursor<'a>,
    depth: usize,
    max_depth: usize,
}

/// The multi-line construct currently open at one nesting level, if any.
///
/// At most one of the three is live at a time; committing to any construct that is not a
/// continuation of the open one closes all of them. The open construct is always the last block
/// of the sequence being built.
#[derive(Default)]
struct OpenState {
    /// Marker kinds of the open lists, outermost first. Mirrors the marker prefix of the most
    /// recent list line.
    list_stack: Vec<ListKind>,
    in_definition: bool,
    in_table: bool,
    /// Whether the previous line produced a paragraph that the next line may merge into.
    prev_paragraph: bool,
}

impl OpenState {
    fn close_all(&mut self) {
        self.list_stack.clear();
        self.in_definition = false;
        self.in_table = false;
    }
}

/// An open region delimiter: a body line starting with at least `count` repeats of `delim`
/// closes the region.
struct Fence {
    delim: char,
    count: usize,
}

impl<'c, 'a> BlockParser<'c, 'a> {
    /// Parse the whole input into a raw (un-normalized) block sequence.
    pub fn parse(cursor: &'c mut Cursor<'a>, options: &ParseOptions) -> Result<Vec<Block>, InvalidNote> {
        let mut parser = Self {
            cursor,
            depth: 0,
            max_depth: options.max_nesting_depth,
        };
        let (blocks, _) = parser.parse_blocks(None);
        if parser.depth != 0 {
            return Err(InvalidNote::UnbalancedNesting(NestingImbalance {
                depth: parser.depth,
                backtrace: Backtrace::force_capture(),
            }));
        }
        Ok(blocks)
    }

    /// Parse blocks until end of stream or, when `close` is given, a line opening with the
    /// closing run. Returns the blocks plus the close line's trailing inline content.
    fn parse_blocks(&mut self, close: Option<Fence>) -> (Vec<Block>, Option<Vec<Inline>>) {
        let mut blocks = Vec::with_capacity(8); // arbitrary guess
        let mut state = OpenState::default();
        loop {
            if let Some(fence) = &close {
                let run = self.cursor.run_len(fence.delim);
                if run >= fence.count {
                    for _ in 0..run {
                        self.cursor.advance();
                    }
                    let tail = self.parse_inline_run(None);
                    self.cursor.consume_line_end();
                    let tail = if tail.is_empty() { None } else { Some(tail) };
                    return (blocks, tail);
                }
            }
            match self.cursor.current() {
                None => return (blocks, None),
                Some('\n') | Some('\r') => {
                    self.cursor.consume_line_end();
                    self.handle_blank(&mut blocks, &mut state);
                }
                Some(_) => self.parse_block(&mut blocks, &mut state),
            }
        }
    }

    fn parse_block(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) {
        self.depth += 1;
        self.parse_block_inner(blocks, state);
        self.depth -= 1;
    }

    fn parse_block_inner(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) {
        let Some(ch) = self.cursor.current() else {
            return;
        };
        if self.depth > self.max_depth {
            // Nested too deep; stop recognizing structure so hostile input can't wind the
            // stack any further.
            self.parse_paragraph(blocks, state);
            return;
        }
        let committed = match ch {
            '`' => self.try_verbatim(blocks, state),
            '"' | '<' => self.try_region(blocks, state, ch),
            '=' => self.try_heading(blocks, state),
            '-' => self.try_horizontal_rule(blocks, state),
            '*' | '#' | '>' => self.try_list_line(blocks, state),
            ';' => self.try_definition_term(blocks, state),
            ':' => self.try_definition_description(blocks, state),
            ' ' => self.try_continuation(blocks, state),
            '|' => self.try_table_row(blocks, state),
            _ => false,
        };
        if !committed {
            self.parse_paragraph(blocks, state);
        }
    }

    /// A blank line. It doesn't close an open list or definition, but it leaves a placeholder
    /// so later continuation lines start fresh paragraphs instead of merging.
    fn handle_blank(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) {
        state.prev_paragraph = false;
        state.in_table = false;
        if !state.list_stack.is_empty() {
            let depth = state.list_stack.len() - 1;
            if let Some(item) = open_list_at(blocks, depth).and_then(|list| list.items.last_mut()) {
                item.push(Block::Blank);
            }
        } else if state.in_definition {
            if let Some(def) = last_open_definition(blocks) {
                def.descriptions.push(vec![Block::Blank]);
            }
        }
    }

    fn parse_paragraph(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) {
        let inlines = self.parse_inline_run(None);
        self.cursor.consume_line_end();
        let continues_previous = state.prev_paragraph;
        state.close_all();
        state.prev_paragraph = true;
        if continues_previous {
            if let Some(Block::Paragraph(prev)) = blocks.last_mut() {
                prev.body.push(Inline::Break(Break { hard: false }));
                prev.body.extend(inlines);
                return;
            }
        }
        blocks.push(n_node!(Block::Paragraph { body: inlines }));
    }

    fn try_verbatim(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        let saved = self.cursor.save();
        let count = self.cursor.run_len('`');
        if count < 3 {
            return false;
        }
        for _ in 0..count {
            self.cursor.advance();
        }
        let attrs = InlineParser::new(self.cursor).parse_attribute_list(true);
        self.skip_spaces();
        if !self.cursor.at_line_end() && !self.cursor.is_end() {
            self.cursor.restore(saved);
            return false;
        }
        self.cursor.consume_line_end();
        state.close_all();
        state.prev_paragraph = false;

        let mut lines = Vec::new();
        loop {
            if self.cursor.is_end() {
                break;
            }
            if self.cursor.run_len('`') >= count {
                self.cursor.skip_to_line_end();
                self.cursor.consume_line_end();
                break;
            }
            let line = self.cursor.take_rest_of_line().to_string();
            self.cursor.consume_line_end();
            lines.push(line);
        }
        blocks.push(n_node!(Block::Verbatim { attrs, lines }));
        true
    }

    fn try_region(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState, delim: char) -> bool {
        let saved = self.cursor.save();
        let count = self.cursor.run_len(delim);
        if count < 3 {
            return false;
        }
        for _ in 0..count {
            self.cursor.advance();
        }
        let attrs = InlineParser::new(self.cursor).parse_attribute_list(true);
        self.skip_spaces();
        if !self.cursor.at_line_end() && !self.cursor.is_end() {
            self.cursor.restore(saved);
            return false;
        }
        self.cursor.consume_line_end();
        state.close_all();
        state.prev_paragraph = false;

        let kind = match delim {
            '"' if attrs.has(Region::VERSE_ATTR) => RegionKind::Verse,
            '"' => RegionKind::Quote,
            _ => RegionKind::Aside,
        };
        let (body, tail) = self.parse_blocks(Some(Fence { delim, count }));
        blocks.push(n_node!(Block::Region { kind, attrs, body, tail }));
        true
    }

    fn try_heading(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        let saved = self.cursor.save();
        let count = self.cursor.run_len('=');
        if !(3..=9).contains(&count) {
            return false;
        }
        for _ in 0..count {
            self.cursor.advance();
        }
        if !self.cursor.eat(' ') {
            self.cursor.restore(saved);
            return false;
        }
        state.close_all();
        state.prev_paragraph = false;

        let mut body = Vec::new();
        let mut attrs = AttrList::default();
        loop {
            match self.cursor.current() {
                None | Some('\n') | Some('\r') => break,
                Some('{') if !matches!(self.cursor.peek(1), Some('{') | Some('~')) => {
                    let parsed = InlineParser::new(self.cursor).parse_attribute_list(true);
                    if self.cursor.current() == Some('{') {
                        // wasn't an attribute list; let the brace flow into text
                        match InlineParser::new(self.cursor).next_inline(None) {
                            Some(inline) => body.push(inline),
                            None => break,
                        }
                    } else {
                        attrs = parsed;
                        self.cursor.skip_to_line_end();
                        break;
                    }
                }
                Some(_) => match InlineParser::new(self.cursor).next_inline(None) {
                    Some(inline) => body.push(inline),
                    None => break,
                },
            }
        }
        self.cursor.consume_line_end();
        blocks.push(n_node!(Block::Heading {
            level: (count - 2) as u8,
            body,
            attrs,
        }));
        true
    }

    fn try_horizontal_rule(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        let saved = self.cursor.save();
        let count = self.cursor.run_len('-');
        if count < 3 {
            return false;
        }
        for _ in 0..count {
            self.cursor.advance();
        }
        let attrs = InlineParser::new(self.cursor).parse_attribute_list(true);
        self.skip_spaces();
        if !self.cursor.at_line_end() && !self.cursor.is_end() {
            self.cursor.restore(saved);
            return false;
        }
        self.cursor.consume_line_end();
        state.close_all();
        state.prev_paragraph = false;
        blocks.push(n_node!(Block::HorizontalRule { attrs }));
        true
    }

    /// A line opening one or more list levels: contiguous marker characters, an optional
    /// attribute list, then a space.
    fn try_list_line(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        let saved = self.cursor.save();
        let mut kinds = Vec::new();
        while let Some(kind) = self.cursor.current().and_then(marker_kind) {
            kinds.push(kind);
            self.cursor.advance();
        }
        let attrs = InlineParser::new(self.cursor).parse_attribute_list(true);
        if !self.cursor.eat(' ') {
            self.cursor.restore(saved);
            return false;
        }
        state.in_definition = false;
        state.in_table = false;
        state.prev_paragraph = false;

        let inlines = self.parse_inline_run(None);
        self.cursor.consume_line_end();

        // Reuse open levels while the marker kinds match; the first mismatch truncates the
        // stack there and new lists are created from that level down.
        let mut first_new = kinds.len().min(state.list_stack.len());
        for i in 0..first_new {
            if state.list_stack[i] != kinds[i] {
                first_new = i;
                break;
            }
        }
        state.list_stack.truncate(first_new);
        for (i, kind) in kinds.iter().enumerate().skip(first_new) {
            let list_attrs = if i == kinds.len() - 1 {
                attrs.clone()
            } else {
                AttrList::default()
            };
            let new_list = n_node!(Block::List {
                kind: *kind,
                attrs: list_attrs,
                items: Vec::new(),
            });
            if i == 0 {
                blocks.push(new_list);
            } else {
                let parent = open_list_at(blocks, i - 1)
                    .expect("open levels above a new list always exist");
                if parent.items.is_empty() {
                    parent.items.push(Vec::new());
                }
                let last_item = parent
                    .items
                    .last_mut()
                    .expect("can't be empty immediately after push");
                last_item.push(new_list);
            }
            state.list_stack.push(*kind);
        }
        state.list_stack.truncate(kinds.len());

        let deepest = open_list_at(blocks, kinds.len() - 1)
            .expect("the deepest list was just created or matched");
        deepest.items.push(vec![n_node!(Block::Paragraph { body: inlines })]);
        true
    }

    fn try_definition_term(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        self.cursor.advance();
        self.cursor.eat(' ');
        let term = self.parse_inline_run(None);
        self.cursor.consume_line_end();
        state.list_stack.clear();
        state.in_table = false;
        state.prev_paragraph = false;

        let definition = Definition {
            term,
            descriptions: Vec::new(),
        };
        match blocks.last_mut() {
            Some(Block::DefinitionList(dl)) if state.in_definition => dl.definitions.push(definition),
            _ => {
                blocks.push(n_node!(Block::DefinitionList {
                    definitions: vec![definition],
                }));
                state.in_definition = true;
            }
        }
        true
    }

    fn try_definition_description(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        if !state.in_definition {
            return false;
        }
        let has_term = last_open_definition(blocks).is_some_and(|def| !def.term.is_empty());
        if !has_term {
            return false;
        }
        self.cursor.advance();
        self.cursor.eat(' ');
        let inlines = self.parse_inline_run(None);
        self.cursor.consume_line_end();
        state.prev_paragraph = false;

        let def = last_open_definition(blocks).expect("checked above");
        def.descriptions.push(vec![n_node!(Block::Paragraph { body: inlines })]);
        true
    }

    /// A leading run of spaces continues the open list item, term, or description.
    fn try_continuation(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        let saved = self.cursor.save();
        let mut spaces = 0;
        while self.cursor.eat(' ') {
            spaces += 1;
        }
        if self.cursor.at_line_end() || self.cursor.is_end() {
            // whitespace-only line: same as blank
            self.cursor.consume_line_end();
            self.handle_blank(blocks, state);
            return true;
        }

        if !state.list_stack.is_empty() {
            let depth = spaces.min(state.list_stack.len()) - 1;
            state.list_stack.truncate(depth + 1);
            let inlines = self.parse_inline_run(None);
            self.cursor.consume_line_end();
            let list = open_list_at(blocks, depth).expect("the list stack mirrors open lists");
            let item = list
                .items
                .last_mut()
                .expect("an open list always has at least one item");
            merge_or_append(item, inlines);
            state.prev_paragraph = false;
            return true;
        }

        if state.in_definition {
            let inlines = self.parse_inline_run(None);
            self.cursor.consume_line_end();
            let def = last_open_definition(blocks).expect("in_definition implies an open definition");
            match def.descriptions.last_mut() {
                None => {
                    // no description yet: this extends the term
                    if !def.term.is_empty() {
                        def.term.push(Inline::Break(Break { hard: false }));
                    }
                    def.term.extend(inlines);
                }
                Some(desc) => merge_or_append(desc, inlines),
            }
            state.prev_paragraph = false;
            return true;
        }

        self.cursor.restore(saved);
        false
    }

    fn try_table_row(&mut self, blocks: &mut Vec<Block>, state: &mut OpenState) -> bool {
        state.list_stack.clear();
        state.in_definition = false;
        state.prev_paragraph = false;

        let mut row: TableRow = Vec::new();
        loop {
            if !self.cursor.eat('|') {
                break;
            }
            if self.cursor.at_line_end() || self.cursor.is_end() {
                break;
            }
            let body = self.parse_inline_run(Some('|'));
            row.push(TableCell { align: None, body });
        }
        self.cursor.consume_line_end();

        if !state.in_table || !matches!(blocks.last(), Some(Block::Table(_))) {
            blocks.push(n_node!(Block::Table {
                alignments: Vec::new(),
                header: None,
                rows: Vec::new(),
            }));
            state.in_table = true;
        }
        let Some(Block::Table(table)) = blocks.last_mut() else {
            unreachable!("a table was just pushed or already open");
        };
        table.rows.push(row);
        true
    }

    fn parse_inline_run(&mut self, stop: Option<char>) -> Vec<Inline> {
        let mut inlines = Vec::new();
        let mut parser = InlineParser::new(self.cursor);
        while let Some(inline) = parser.next_inline(stop) {
            inlines.push(inline);
        }
        inlines
    }

    fn skip_spaces(&mut self) {
        while matches!(self.cursor.current(), Some(' ') | Some('\t')) {
            self.cursor.advance();
        }
    }
}

fn marker_kind(ch: char) -> Option<ListKind> {
    match ch {
        '*' => Some(ListKind::Unordered),
        '#' => Some(ListKind::Ordered),
        '>' => Some(ListKind::Quote),
        _ => None,
    }
}

/// Descend to the open list at `depth`, starting from the last block of the sequence. The open
/// list at each level is the last block of the previous level's last item.
fn open_list_at(blocks: &mut [Block], depth: usize) -> Option<&mut List> {
    let mut list = match blocks.last_mut() {
        Some(Block::List(list)) => list,
        _ => return None,
    };
    for _ in 0..depth {
        let item = list.items.last_mut()?;
        list = match item.last_mut() {
            Some(Block::List(inner)) => inner,
            _ => return None,
        };
    }
    Some(list)
}

fn last_open_definition(blocks: &mut [Block]) -> Option<&mut Definition> {
    match blocks.last_mut() {
        Some(Block::DefinitionList(dl)) => dl.definitions.last_mut(),
        _ => None,
    }
}

/// Merge into a trailing paragraph with a soft break, or append a fresh one. A placeholder left
/// by a blank line prevents the merge, which is exactly its job.
fn merge_or_append(seq: &mut Vec<Block>, inlines: Vec<Inline>) {
    if let Some(Block::Paragraph(prev)) = seq.last_mut() {
        prev.body.push(Inline::Break(Break { hard: false }));
        prev.body.extend(inlines);
    } else {
        seq.push(n_node!(Block::Paragraph { body: inlines }));
    }
}
