#[cfg(test)]
pub(crate) use test_utils::*;

#[cfg(test)]
mod test_utils {
    macro_rules! nm_elem {
        ( $($node_names:ident)::* {$($args:tt)*}) => {
            crate::note_elem::tree::n_node!(Block::$($node_names)::* {$($args)*})
        };
        ($paragraph_text:literal) => {
            crate::note_elem::tree::n_node!(Block::Paragraph{body: vec![nm_inline!($paragraph_text)]})
        };
    }
    pub(crate) use nm_elem;

    macro_rules! nm_elems {
        [$($first:tt $( $(:: $($rest:ident)::* )? {$($attr:ident: $val:expr),*$(,)?})? ),*$(,)?] => {
            vec![$(
                nm_elem!($first$( $(:: $($rest)::*)? { $($attr: $val),* })?)
                ),*
            ]
        };
    }
    pub(crate) use nm_elems;

    macro_rules! nm_inline {
        ($text:literal) => {
            crate::note_elem::tree::elem::Inline::Text(crate::note_elem::tree::elem::Text {
                value: $text.to_string(),
            })
        };
    }
    pub(crate) use nm_inline;

    macro_rules! inlines {
        // Empty case
        [] => {
            Vec::<crate::note_elem::tree::elem::Inline>::new()
        };

        // String literal (optionally followed by more content)
        [$text:literal $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Text(crate::note_elem::tree::elem::Text {
                        value: $text.to_string(),
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Soft break (optionally followed by more content)
        [br $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Break(crate::note_elem::tree::elem::Break {
                        hard: false,
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Hard break (optionally followed by more content)
        [hardbr $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Break(crate::note_elem::tree::elem::Break {
                        hard: true,
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Emphasis, as normalization leaves it (optionally followed by more content)
        [em[$($content:tt)*] $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Format(crate::note_elem::tree::elem::Format {
                        kind: crate::note_elem::tree::elem::FormatKind::Emphasis,
                        attrs: crate::note_elem::tree::elem::AttrList::default(),
                        children: inlines![$($content)*],
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Strong, as normalization leaves it (optionally followed by more content)
        [strong[$($content:tt)*] $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Format(crate::note_elem::tree::elem::Format {
                        kind: crate::note_elem::tree::elem::FormatKind::Strong,
                        attrs: crate::note_elem::tree::elem::AttrList::default(),
                        children: inlines![$($content)*],
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Link, like `link["display"]("target")`
        [link[$($display:tt)*] ($target:literal) $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Link(crate::note_elem::tree::elem::Link {
                        target: $target.to_string(),
                        display: inlines![$($display)*],
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Footnote, like `footnote["1"]`
        [footnote[$val:literal] $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Footnote(crate::note_elem::tree::elem::Footnote {
                        label: $val.to_string(),
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };

        // Mark, like `mark["anchor"]`
        [mark[$val:literal] $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![
                    crate::note_elem::tree::elem::Inline::Mark(crate::note_elem::tree::elem::Mark {
                        name: $val.to_string(),
                    })
                ];
                $(result.extend(inlines![$($rest)*]);)?
                result
            }
        };
    }
    pub(crate) use inlines;
}
