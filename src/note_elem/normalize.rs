//! The post-processing pass that rewrites a raw parse tree into the canonical,
//! renderer-ready shape.
//!
//! One bottom-up traversal per tree. It never fails: node shapes it doesn't expect are passed
//! through untouched.

use crate::note_elem::concatenate::Concatenate;
use crate::note_elem::tree::elem::*;
use crate::note_elem::tree::{n_node, Block};
use std::collections::HashSet;

/// State threaded through one normalization pass.
pub(crate) struct NormalizeState {
    /// Anchor names seen so far; later marks with a seen name get blanked.
    seen_marks: HashSet<String>,
    /// Inside a verse region, whitespace is structural: spaces become non-breaking and breaks
    /// become hard instead of being collapsed away.
    verse: bool,
}

impl NormalizeState {
    pub fn new() -> Self {
        Self {
            seen_marks: HashSet::with_capacity(4), // total guess
            verse: false,
        }
    }
}

/// Normalize a block sequence in place: children first, then compaction of placeholders and
/// empty paragraphs at this level.
pub(crate) fn normalize_blocks(blocks: &mut Vec<Block>, state: &mut NormalizeState) {
    for block in blocks.iter_mut() {
        normalize_block(block, state);
    }
    blocks.retain(|block| match block {
        Block::Blank => false,
        Block::Paragraph(para) => !para.body.is_empty(),
        _ => true,
    });
}

fn normalize_block(block: &mut Block, state: &mut NormalizeState) {
    match block {
        Block::Paragraph(para) => normalize_inlines(&mut para.body, state),
        Block::Verbatim(_) => {}
        Block::Region(region) => {
            let was_verse = state.verse;
            if region.kind == RegionKind::Verse {
                state.verse = true;
            }
            normalize_blocks(&mut region.body, state);
            if let Some(tail) = &mut region.tail {
                normalize_inlines(tail, state);
                if tail.is_empty() {
                    region.tail = None;
                }
            }
            state.verse = was_verse;
        }
        Block::Heading(heading) => {
            heading.level = heading.level.min(6);
            normalize_inlines(&mut heading.body, state);
        }
        Block::HorizontalRule(_) => {}
        Block::List(list) => {
            for item in &mut list.items {
                normalize_blocks(item, state);
            }
        }
        Block::DefinitionList(dl) => {
            for def in &mut dl.definitions {
                normalize_inlines(&mut def.term, state);
                for desc in &mut def.descriptions {
                    normalize_blocks(desc, state);
                }
                // a description that was only a blank-line placeholder is now empty; drop it
                def.descriptions.retain(|desc| !desc.is_empty());
            }
        }
        Block::Table(table) => normalize_table(table, state),
        Block::Blank => {}
    }
}

fn normalize_table(table: &mut Table, state: &mut NormalizeState) {
    for row in &mut table.rows {
        for cell in row.iter_mut() {
            normalize_inlines(&mut cell.body, state);
        }
    }
    if let Some(header) = &mut table.header {
        for cell in header.iter_mut() {
            normalize_inlines(&mut cell.body, state);
        }
    }

    let mut width = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    if let Some(header) = &table.header {
        width = width.max(header.len());
    }

    // Header detection only applies to a table that doesn't have one yet, so re-normalizing
    // can't swallow a data row.
    if table.header.is_none() && first_row_is_header(&table.rows) {
        let mut header = table.rows.remove(0);
        let mut alignments = vec![None; width];
        for (idx, cell) in header.iter_mut().enumerate() {
            strip_leading_equals(cell);
            alignments[idx] = strip_trailing_alignment(cell);
        }
        table.alignments = alignments;
        table.header = Some(header);
    } else if table.alignments.len() != width {
        table.alignments.resize(width, None);
    }

    for row in &mut table.rows {
        for cell in row.iter_mut() {
            if cell.align.is_none() {
                cell.align = strip_leading_alignment(cell);
            }
        }
        pad_row(row, width, &table.alignments);
    }
    if let Some(header) = &mut table.header {
        pad_row(header, width, &table.alignments);
    }
}

/// A first row where any cell opens with `=` text is a header row.
fn first_row_is_header(rows: &[TableRow]) -> bool {
    let Some(first) = rows.first() else {
        return false;
    };
    first
        .iter()
        .any(|cell| matches!(cell.body.first(), Some(Inline::Text(text)) if text.value.starts_with('=')))
}

fn strip_leading_equals(cell: &mut TableCell) {
    if let Some(Inline::Text(text)) = cell.body.first_mut() {
        if text.value.starts_with('=') {
            text.value.remove(0);
            if text.value.is_empty() {
                cell.body.remove(0);
            }
        }
    }
}

/// `:` center, `<` left, `>` right as the final character of a header cell's last text run; any
/// other trailing character means the column has no explicit alignment.
fn strip_trailing_alignment(cell: &mut TableCell) -> Option<ColumnAlignment> {
    let Some(Inline::Text(text)) = cell.body.last_mut() else {
        return None;
    };
    let align = match text.value.chars().last() {
        Some(':') => ColumnAlignment::Center,
        Some('<') => ColumnAlignment::Left,
        Some('>') => ColumnAlignment::Right,
        _ => return None,
    };
    text.value.pop();
    if text.value.is_empty() {
        cell.body.pop();
    }
    Some(align)
}

/// A data cell's leading marker overrides its column's alignment for that cell only.
fn strip_leading_alignment(cell: &mut TableCell) -> Option<ColumnAlignment> {
    let Some(Inline::Text(text)) = cell.body.first_mut() else {
        return None;
    };
    let align = match text.value.chars().next() {
        Some(':') => ColumnAlignment::Center,
        Some('<') => ColumnAlignment::Left,
        Some('>') => ColumnAlignment::Right,
        _ => return None,
    };
    text.value.remove(0);
    if text.value.is_empty() {
        cell.body.remove(0);
    }
    Some(align)
}

fn pad_row(row: &mut TableRow, width: usize, alignments: &[Option<ColumnAlignment>]) {
    while row.len() < width {
        let align = alignments.get(row.len()).copied().flatten();
        row.push(TableCell { align, body: Vec::new() });
    }
}

/// Normalize one inline sequence in place.
pub(crate) fn normalize_inlines(inlines: &mut Vec<Inline>, state: &mut NormalizeState) {
    inlines.retain(|inline| !matches!(inline, Inline::Text(text) if text.value.is_empty()));

    if !state.verse {
        strip_leading(inlines);
    }
    merge_scan(inlines, state);
    if !state.verse {
        strip_trailing(inlines);
    }

    // Per-node rewrites, in document order so mark deduplication sees first occurrences first.
    for inline in inlines.iter_mut() {
        match inline {
            Inline::Text(text) => {
                if text.value.contains("...") {
                    text.value = substitute_ellipses(&text.value);
                }
            }
            Inline::Mark(mark) => {
                if !mark.name.is_empty() {
                    if state.seen_marks.contains(&mark.name) {
                        mark.name.clear();
                    } else {
                        state.seen_marks.insert(mark.name.clone());
                    }
                }
            }
            Inline::Format(format) => {
                if format.attrs.remove(Format::DEFAULT_ATTR) {
                    format.kind = match format.kind {
                        FormatKind::Italic => FormatKind::Emphasis,
                        FormatKind::Bold => FormatKind::Strong,
                        other => other,
                    };
                }
                normalize_inlines(&mut format.children, state);
            }
            Inline::Link(link) => normalize_inlines(&mut link.display, state),
            Inline::Edit(edit) => {
                normalize_inlines(&mut edit.delete, state);
                normalize_inlines(&mut edit.insert, state);
            }
            _ => {}
        }
    }
}

fn strip_leading(inlines: &mut Vec<Inline>) {
    while matches!(inlines.first(), Some(Inline::Space(_)) | Some(Inline::Break(_))) {
        inlines.remove(0);
    }
}

fn strip_trailing(inlines: &mut Vec<Inline>) {
    while matches!(inlines.last(), Some(Inline::Space(_)) | Some(Inline::Break(_))) {
        inlines.pop();
    }
}

/// Forward scan merging adjacent nodes, rescanning until nothing applies (merges can cascade:
/// in verse, a space merging into text can make two text runs adjacent).
fn merge_scan(inlines: &mut Vec<Inline>, state: &NormalizeState) {
    if state.verse {
        for inline in inlines.iter_mut() {
            if let Inline::Break(brk) = inline {
                brk.hard = true;
            }
        }
    }
    loop {
        let before = inlines.len();
        *inlines = Concatenate::concatenate_similar(std::mem::take(inlines));
        let mut changed = inlines.len() != before;

        let mut idx = 0;
        while idx < inlines.len() {
            let replacement = match (&inlines[idx], inlines.get(idx + 1)) {
                (Inline::Space(space), Some(Inline::Break(_))) if space.count >= 2 => {
                    Some(n_node!(Inline::Break { hard: true }))
                }
                (Inline::Space(space), Some(Inline::Text(text))) if state.verse => {
                    let mut value = "\u{a0}".repeat(space.count);
                    value.push_str(&text.value);
                    Some(n_node!(Inline::Text { value }))
                }
                _ => None,
            };
            match replacement {
                Some(merged) => {
                    inlines[idx] = merged;
                    inlines.remove(idx + 1);
                    changed = true;
                }
                None => idx += 1,
            }
        }
        if !changed {
            break;
        }
    }
}

/// Replace `...` with `…` when the three periods end the run or are followed by punctuation.
fn substitute_ellipses(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut result = String::with_capacity(value.len());
    let mut idx = 0;
    while idx < chars.len() {
        let dots = chars[idx] == '.'
            && chars.get(idx + 1) == Some(&'.')
            && chars.get(idx + 2) == Some(&'.');
        if dots && !(idx > 0 && chars[idx - 1] == '.') {
            let next_ok = match chars.get(idx + 3) {
                None => true,
                Some(c) => matches!(c, ',' | ';' | ':' | '!' | '?'),
            };
            if next_ok {
                result.push('…');
                idx += 3;
                continue;
            }
        }
        result.push(chars[idx]);
        idx += 1;
    }
    result
}
