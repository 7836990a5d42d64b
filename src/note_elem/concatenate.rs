use crate::note_elem::tree::elem::Inline;

pub trait Concatenate: Sized {
    fn try_concatenate(&mut self, other: Self) -> Result<(), Self>;

    fn concatenate_similar(items: Vec<Self>) -> Vec<Self> {
        let mut results = Vec::with_capacity(items.len());
        let mut iter = items.into_iter();
        let Some(first) = iter.next() else {
            return results;
        };
        results.push(first);
        let mut prev = results.last_mut().expect("can't be empty immediately after push");

        for curr in iter {
            match prev.try_concatenate(curr) {
                Ok(()) => {}
                Err(new_segment) => {
                    results.push(new_segment);
                    prev = results.last_mut().expect("can't be empty immediately after push");
                }
            }
        }
        results
    }
}

impl Concatenate for Inline {
    fn try_concatenate(&mut self, other: Self) -> Result<(), Self> {
        match (self, other) {
            (Self::Text(my), Self::Text(other)) => {
                // Only plain text merges; every other inline kind has semantic identity of its
                // own, even when adjacent nodes look alike.
                my.value.push_str(&other.value);
                Ok(())
            }
            (_, other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note_elem::tree_test_utils::*;
    use crate::note_elem::tree::elem::*;

    #[test]
    fn adjacent_text_merges() {
        let merged = Concatenate::concatenate_similar(inlines!["one", "two", "three"]);
        assert_eq!(merged, inlines!["onetwothree"]);
    }

    #[test]
    fn non_text_stays_separate() {
        let items = vec![
            nm_inline!("a"),
            Inline::Space(Space { count: 1 }),
            Inline::Space(Space { count: 1 }),
            nm_inline!("b"),
        ];
        let merged = Concatenate::concatenate_similar(items.clone());
        assert_eq!(merged, items);
    }

    #[test]
    fn empty() {
        let merged: Vec<Inline> = Concatenate::concatenate_similar(Vec::new());
        assert_eq!(merged, Vec::new());
    }
}
