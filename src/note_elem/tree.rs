use crate::note_elem::block_parse::BlockParser;
use crate::note_elem::cursor::Cursor;
use crate::note_elem::inline_parse::InlineParser;
use crate::note_elem::normalize;
use serde::Serialize;
use std::backtrace::Backtrace;
use std::fmt::{Display, Formatter};

use elem::*;

/// A fully parsed and normalized note.
///
/// This is just the ordered sequence of top-level [Block]s. See [`NoteDoc::parse`] for how to
/// create one.
#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct NoteDoc {
    pub roots: Vec<Block>,
}

/// Options for parsing a note.
///
/// See: [`NoteDoc::parse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// How deeply blocks may nest before the parser stops recognizing new structure and degrades
    /// the remaining input to paragraphs. This bounds recursion against hostile input (thousands
    /// of nested region openers); you should rarely need to change it.
    pub max_nesting_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 100,
        }
    }
}

impl NoteDoc {
    /// Parse a note body into its normalized document tree.
    ///
    /// Malformed markup is never an error: any line that fails to parse as a structural block is
    /// kept as paragraph text. The only possible `Err` is [`InvalidNote::UnbalancedNesting`],
    /// which indicates a bug in the parser itself rather than a problem with the input.
    ///
    /// ```
    /// use notemark::note_elem::{NoteDoc, ParseOptions, Block, elem::*};
    ///
    /// let doc = NoteDoc::parse("hello", &ParseOptions::default()).unwrap();
    /// let expected = vec![Block::Paragraph(Paragraph {
    ///     body: vec![Inline::Text(Text { value: "hello".to_string() })],
    /// })];
    /// assert_eq!(doc.roots, expected);
    /// ```
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Self, InvalidNote> {
        let mut cursor = Cursor::new(text);
        let mut roots = BlockParser::parse(&mut cursor, options)?;
        normalize::normalize_blocks(&mut roots, &mut normalize::NormalizeState::new());
        Ok(Self { roots })
    }

    /// Parse a fragment as inline content only, without block structure.
    ///
    /// Lines are joined with soft [`Break`]s, and the result is normalized the same way a
    /// paragraph body would be. Useful for contexts like titles or table-of-contents entries
    /// where block markup isn't allowed.
    pub fn parse_inlines(text: &str) -> Vec<Inline> {
        let mut cursor = Cursor::new(text);
        let mut result = Vec::new();
        loop {
            let mut inlines = InlineParser::new(&mut cursor);
            while let Some(inline) = inlines.next_inline(None) {
                result.push(inline);
            }
            if !cursor.consume_line_end() {
                break;
            }
            if cursor.is_end() {
                break;
            }
            result.push(Inline::Break(Break { hard: false }));
        }
        normalize::normalize_inlines(&mut result, &mut normalize::NormalizeState::new());
        result
    }
}

/// The possible error from parsing a note.
///
/// Parsing is total over its input; this error only reports internal-consistency violations.
#[derive(Debug, PartialEq)]
pub enum InvalidNote {
    /// Internal error: the parser's nesting-depth counter did not return to zero after a
    /// top-level parse. You shouldn't get this; if you do, please report it along with the input
    /// that triggered it.
    UnbalancedNesting(NestingImbalance),
}

impl std::error::Error for InvalidNote {}

impl Display for InvalidNote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidNote::UnbalancedNesting(err) => {
                writeln!(f, "internal error: unbalanced block nesting (depth {})", err.depth)?;
                Display::fmt(&err.backtrace, f)
            }
        }
    }
}

/// Details for [`InvalidNote::UnbalancedNesting`].
// A wrapper for [Backtrace] that implements [PartialEq] to always return `true`. This lets us use
// it in an enum while still letting us use `#[derive(PartialEq)]`.
#[derive(Debug)]
pub struct NestingImbalance {
    pub(crate) depth: usize,
    pub(crate) backtrace: Backtrace,
}

impl PartialEq for NestingImbalance {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for NestingImbalance {}

/// A single block-level node of a parsed note.
///
/// Blocks come in three flavors:
///
/// - container blocks ([`Region`], [`List`], [`DefinitionList`]), which hold other blocks;
/// - leaf blocks ([`Paragraph`], [`Heading`], [`Table`], [`Verbatim`], [`HorizontalRule`]),
///   which hold inline content or raw text;
/// - the internal [`Block::Blank`] placeholder, which records a blank continuation line during
///   parsing and never survives normalization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Verbatim(Verbatim),
    Region(Region),
    Heading(Heading),
    HorizontalRule(HorizontalRule),
    List(List),
    DefinitionList(DefinitionList),
    Table(Table),

    /// Placeholder for a blank continuation line inside an open list item or definition.
    ///
    /// Only the parser creates these, and normalization always removes them; a normalized tree
    /// never contains one.
    Blank,
}

/// Inner details of the [Block] variants, and all inline content.
///
/// There are three kinds of items in this module:
///
/// - **block structs**, one per [Block] variant that carries data;
/// - **inline nodes** ([`Inline`] and its variant structs), the units of content within a line;
/// - **supporting items** (attribute lists, marker kinds, alignments) that are sub-components of
///   the above rather than nodes of their own.
pub mod elem {
    use super::*;

    /// A table row: just a `Vec` of cells, aliased to make signatures easier to read.
    pub type TableRow = Vec<TableCell>;

    /// One item of a [List]: an ordered sequence of blocks.
    ///
    /// An item holding a nested list carries that list as one of its blocks; nesting is never a
    /// sibling edge on the list itself.
    pub type ListItem = Vec<Block>;

    /// One description of a [Definition]: an ordered sequence of blocks.
    pub type Description = Vec<Block>;

    /// Leaf block holding a run of inline content.
    ///
    /// Consecutive plain-text lines merge into a single paragraph at parse time, joined by soft
    /// [`Break`]s. A paragraph whose body normalizes to empty is dropped from the tree.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Paragraph {
        pub body: Vec<Inline>,
    }

    /// Leaf block whose body is stored raw, line by line, with no inline parsing.
    ///
    /// ````text
    /// ```
    /// fn main() {}
    /// ```
    /// ````
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Verbatim {
        pub attrs: AttrList,
        pub lines: Vec<String>,
    }

    /// Which kind of container a [Region] is.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RegionKind {
        /// A quotation (`"""`).
        Quote,
        /// A verse (`"""` with the `verse` attribute): whitespace inside is structural and is
        /// preserved by normalization instead of collapsed.
        Verse,
        /// An aside (`<<<`).
        Aside,
    }

    /// Container block: a delimited region holding nested blocks, and optionally a trailing run
    /// of inline content from its closing line.
    ///
    /// ```text
    /// """ {verse}
    /// roses are red
    /// violets are blue
    /// """ — anonymous
    /// ```
    ///
    /// The `— anonymous` above becomes the region's `tail`. After normalization `tail` is
    /// `None` whenever it would be empty, so callers can test for "no trailing content" with one
    /// check.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Region {
        pub kind: RegionKind,
        pub attrs: AttrList,
        pub body: Vec<Block>,
        pub tail: Option<Vec<Inline>>,
    }

    impl Region {
        /// The attribute that marks a `"""` region as verse.
        pub const VERSE_ATTR: &'static str = "verse";
    }

    /// Leaf block: a heading.
    ///
    /// Written as a run of 3–9 `=` followed by a space; the raw run maps to levels 1 through 7
    /// at parse time, and normalization clamps the result to the public 1–6 range.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Heading {
        pub level: u8,
        pub body: Vec<Inline>,
        pub attrs: AttrList,
    }

    /// Leaf block: a horizontal rule (`---`).
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct HorizontalRule {
        pub attrs: AttrList,
    }

    /// The marker kind of a [List], fixed at creation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ListKind {
        /// `*`
        Unordered,
        /// `#`
        Ordered,
        /// `>`
        Quote,
    }

    /// Container block: a list.
    ///
    /// ```
    /// use notemark::note_elem::{NoteDoc, ParseOptions, Block, elem::*};
    ///
    /// let doc = NoteDoc::parse("* one\n* two", &ParseOptions::default()).unwrap();
    /// let expected = vec![Block::List(List {
    ///     kind: ListKind::Unordered,
    ///     attrs: AttrList::default(),
    ///     items: vec![
    ///         vec![Block::Paragraph(Paragraph {
    ///             body: vec![Inline::Text(Text { value: "one".to_string() })],
    ///         })],
    ///         vec![Block::Paragraph(Paragraph {
    ///             body: vec![Inline::Text(Text { value: "two".to_string() })],
    ///         })],
    ///     ],
    /// })];
    /// assert_eq!(doc.roots, expected);
    /// ```
    ///
    /// A deeper list (`** x`) lives as a block child of the last item of its parent list, not as
    /// a sibling.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct List {
        pub kind: ListKind,
        pub attrs: AttrList,
        pub items: Vec<ListItem>,
    }

    /// Container block: a definition list, pairing terms with descriptions.
    ///
    /// ```text
    /// ; term
    /// : first description
    /// : second description
    /// ```
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct DefinitionList {
        pub definitions: Vec<Definition>,
    }

    /// One term and its descriptions within a [DefinitionList].
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Definition {
        pub term: Vec<Inline>,
        pub descriptions: Vec<Description>,
    }

    /// Leaf block: a table.
    ///
    /// After normalization the table is rectangular: every row (and the header, if present) has
    /// exactly `alignments.len()` cells, padded on the right with empty cells as needed.
    ///
    /// ```
    /// use notemark::note_elem::{NoteDoc, ParseOptions, Block, elem::*};
    ///
    /// let doc = NoteDoc::parse("|=A:|=B>|\n|1|2|", &ParseOptions::default()).unwrap();
    /// let Block::Table(table) = &doc.roots[0] else { panic!("expected a table") };
    /// assert_eq!(
    ///     table.alignments,
    ///     vec![Some(ColumnAlignment::Center), Some(ColumnAlignment::Right)],
    /// );
    /// assert_eq!(table.header.as_ref().map(Vec::len), Some(2));
    /// assert_eq!(table.rows.len(), 1);
    /// ```
    #[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Table {
        /// Per-column alignment; the length always equals the table's width.
        pub alignments: Vec<Option<ColumnAlignment>>,
        /// The header row, split out of `rows` by normalization when the first row's cells start
        /// with `=`.
        pub header: Option<TableRow>,
        pub rows: Vec<TableRow>,
    }

    /// A single cell of a table row.
    #[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct TableCell {
        /// This cell's own alignment, when it overrides its column's.
        pub align: Option<ColumnAlignment>,
        pub body: Vec<Inline>,
    }

    /// Horizontal alignment of a table column or cell.
    ///
    /// This enum does not define "no alignment"; that's represented as the `None` of an
    /// `Option<ColumnAlignment>`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ColumnAlignment {
        Left,
        Right,
        Center,
    }

    /// A unit of content within a line.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Inline {
        /// A run of ordinary text; a terminal node.
        Text(Text),
        /// A run of whitespace, with its length remembered.
        Space(Space),
        /// A line break, soft (wrappable) or hard (forced).
        Break(Break),
        /// A link: `[[target]]` or `[[target|display]]`.
        Link(Link),
        /// An image: `{{src}}` or `{{src|alt}}`.
        Image(Image),
        /// A citation key: `[@key]`.
        Citation(Citation),
        /// A footnote marker: `[^label]`. This is only the marker; the footnote body lives
        /// wherever the note's conventions put it.
        Footnote(Footnote),
        /// A named anchor: `[#name]`. Normalization blanks all but the first anchor of a given
        /// name in a document.
        Mark(Mark),
        /// A formatted span (`**strong**`, `//emphasis//`, …) carrying an attribute set.
        Format(Format),
        /// A tracked edit: a delete + insert pair, `{~old~>new~}`.
        Edit(Edit),
        /// An inline verbatim span: `` `code` ``.
        Literal(Literal),
        /// A hashtag: `#name`.
        Tag(Tag),
        /// Embedded binary content, written as an image whose source is a `data:` URL.
        Blob(Blob),
    }

    /// Terminal inline: a run of plain text.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Text {
        pub value: String,
    }

    /// Terminal inline: a whitespace run.
    ///
    /// Normalization collapses most of these away (merging into text, upgrading breaks); inside
    /// a verse region they are structural and preserved.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Space {
        pub count: usize,
    }

    /// Terminal inline: a line break.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Break {
        /// A hard break must be rendered as a forced line break; a soft break is merely a wrap
        /// opportunity.
        pub hard: bool,
    }

    /// Inline link. The display content is itself inline content, so links can carry formatted
    /// text.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Link {
        pub target: String,
        pub display: Vec<Inline>,
    }

    /// Terminal inline: an image reference.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Image {
        pub src: String,
        pub alt: String,
    }

    /// Terminal inline: a citation key.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Citation {
        pub key: String,
    }

    /// Terminal inline: a footnote marker.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Footnote {
        pub label: String,
    }

    /// Terminal inline: a named anchor.
    ///
    /// Anchor names are unique per document after normalization: the first occurrence of a name
    /// wins, and later occurrences have their name blanked.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Mark {
        pub name: String,
    }

    /// Which styling a [Format] span applies.
    ///
    /// `Italic` and `Bold` are the visual styles as written; normalization recodes them to the
    /// semantic `Emphasis`/`Strong` when the span carries the [`Format::DEFAULT_ATTR`] marker.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FormatKind {
        Italic,
        Bold,
        Underline,
        Strike,
        Emphasis,
        Strong,
    }

    /// Inline formatted span. Children are inline content, so spans nest.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Format {
        pub kind: FormatKind,
        pub attrs: AttrList,
        pub children: Vec<Inline>,
    }

    impl Format {
        /// The attribute marking a span as written in the dialect's default styling, with no
        /// explicit attribute list of its own.
        pub const DEFAULT_ATTR: &'static str = "default";
    }

    /// Inline tracked edit: deleted content plus its replacement.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Edit {
        pub delete: Vec<Inline>,
        pub insert: Vec<Inline>,
    }

    /// Terminal inline: verbatim text, stored raw.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Literal {
        pub value: String,
    }

    /// Terminal inline: a hashtag.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Tag {
        pub name: String,
    }

    /// Terminal inline: embedded binary content.
    ///
    /// The payload is kept base64-encoded as written; decoding is a renderer concern.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Blob {
        pub media_type: String,
        pub payload: String,
    }

    /// A single `name` or `name=value` attribute.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Attr {
        pub name: String,
        pub value: Option<String>,
    }

    /// An ordered attribute set, as written in a `{...}` attribute list.
    #[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct AttrList {
        attrs: Vec<Attr>,
    }

    impl AttrList {
        pub fn is_empty(&self) -> bool {
            self.attrs.is_empty()
        }

        pub fn has(&self, name: &str) -> bool {
            self.attrs.iter().any(|attr| attr.name == name)
        }

        /// The value of the first attribute with this name, if it has one.
        pub fn get(&self, name: &str) -> Option<&str> {
            self.attrs
                .iter()
                .find(|attr| attr.name == name)
                .and_then(|attr| attr.value.as_deref())
        }

        pub fn push(&mut self, attr: Attr) {
            self.attrs.push(attr);
        }

        /// Remove every attribute with this name; reports whether any was present.
        pub fn remove(&mut self, name: &str) -> bool {
            let before = self.attrs.len();
            self.attrs.retain(|attr| attr.name != name);
            self.attrs.len() != before
        }

        pub fn iter(&self) -> impl Iterator<Item = &Attr> {
            self.attrs.iter()
        }
    }

    impl FromIterator<Attr> for AttrList {
        fn from_iter<T: IntoIterator<Item = Attr>>(iter: T) -> Self {
            Self {
                attrs: iter.into_iter().collect(),
            }
        }
    }
}

/// Creates a nested enum.
///
/// This macro translates:
/// ```text
/// n_node!(Block::List { kind, attrs, items })
/// ```
///
/// into:
///
/// ```text
/// Block::List(List { kind, attrs, items })
/// ```
macro_rules! n_node {
    // Terminal cases for Foo{ bar: bazz } in its various configurations
    ($last:ident { $($args:tt)* }) => {
        $last {
            $($args)*
        }
    };

    // Terminal empty struct: Foo::Bar
    ($last:ident :: $next:ident) => {
        $last::$next
    };

    // Recursive case: A::B<tail> -> A::B(B<tail>)
    ($head:ident :: $next:ident $(:: $($tail:ident)::*)? $({ $($args:tt)* })? ) => {
        $head::$next( n_node!($next $(:: $($tail)::*)? $({ $($args)* })?) )
    };
}
pub(crate) use n_node;
