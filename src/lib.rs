//! notemark parses a lightweight note markup, of the kind personal knowledge bases use, into a
//! normalized document tree that renderers can walk.
//!
//! The pipeline has two stages, always run in sequence:
//!
//! 1. a recursive-descent block parser turns the note text into a raw tree of
//!    [`note_elem::Block`]s;
//! 2. a normalization pass rewrites that tree in place: merging adjacent text, pruning
//!    parse-time placeholders, shaping tables, and applying a few typographic substitutions.
//!
//! Malformed markup never errors; anything that fails to parse as structure is kept as
//! paragraph text.
//!
//! ```
//! use notemark::note_elem::{NoteDoc, ParseOptions};
//!
//! let doc = NoteDoc::parse("=== Title\n\nbody text", &ParseOptions::default()).unwrap();
//! assert_eq!(doc.roots.len(), 2);
//! ```
//!
//! Start at [`note_elem::NoteDoc::parse`] for the library surface, or [`run::run`] for the
//! CLI-shaped entry point.

mod util;

pub mod note_elem;
pub mod run;
