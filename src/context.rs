//! Generic "item with its neighbours within a window" streaming adapter
//! (§4.G), used by both the SNV proximity filters (§4.D/§4.E) and the
//! alignment-result pipeline's notion of locality.
//!
//! Grounded on `original_source/biolib/src/biolib/collections_.py::
//! item_context_iter`: a pull iterator over a bounded deque rather than the
//! original's generator (Design Note, §9).

use std::collections::VecDeque;
use std::iter::Peekable;

/// An item that can be placed on a reference at a location, for context
/// windowing purposes.
pub trait Located {
    fn reference(&self) -> &str;
    fn location(&self) -> i64;
}

/// Yields `(item, context)` pairs from a stream sorted by `(reference,
/// location)`. `context` holds every item (including `item` itself) on the
/// same reference within `window/2` of `item`'s location; `window = None`
/// means the context spans the whole reference.
///
/// Memory is bounded by the number of items that can simultaneously fall
/// within one window (the densest window): an item is dropped from the
/// internal buffer once it falls outside the window of the item most
/// recently yielded as head, since locations only increase from there on.
pub struct ContextIter<I: Iterator<Item = T>, T: Located + Clone> {
    inner: Peekable<I>,
    window: Option<i64>,
    buffer: VecDeque<T>,
    /// Index into `buffer` of the item to be yielded as head next.
    head_idx: usize,
}

impl<I: Iterator<Item = T>, T: Located + Clone> ContextIter<I, T> {
    pub fn new(inner: I, window: Option<i64>) -> Self {
        Self {
            inner: inner.peekable(),
            window,
            buffer: VecDeque::new(),
            head_idx: 0,
        }
    }

    fn half_width(&self) -> Option<i64> {
        self.window.map(|w| w / 2)
    }

    fn within_window(&self, head: &T, candidate: &T) -> bool {
        if candidate.reference() != head.reference() {
            return false;
        }
        match self.half_width() {
            None => true,
            Some(half) => (candidate.location() - head.location()).abs() <= half,
        }
    }
}

impl<I: Iterator<Item = T>, T: Located + Clone> Iterator for ContextIter<I, T> {
    type Item = (T, Vec<T>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.head_idx >= self.buffer.len() {
            let item = self.inner.next()?;
            self.buffer.push_back(item);
        }
        let head = self.buffer[self.head_idx].clone();

        // Pull ahead while the next item could still belong to head's context.
        loop {
            let keep_pulling = match self.inner.peek() {
                None => false,
                Some(next_item) => self.within_window(&head, next_item),
            };
            if !keep_pulling {
                break;
            }
            self.buffer.push_back(self.inner.next().unwrap());
        }

        let context: Vec<T> = self
            .buffer
            .iter()
            .filter(|it| self.within_window(&head, it))
            .cloned()
            .collect();

        self.head_idx += 1;

        // Items behind head's window can never re-enter a later head's
        // window, since locations only increase from here on; evict them.
        while let Some(front) = self.buffer.front() {
            if self.within_window(&head, front) {
                break;
            }
            self.buffer.pop_front();
            self.head_idx -= 1;
        }

        Some((head, context))
    }
}

/// Convenience constructor matching the module's name in SPEC_FULL.md.
pub fn context_iter<I: Iterator<Item = T>, T: Located + Clone>(
    items: I,
    window: Option<i64>,
) -> ContextIter<I, T> {
    ContextIter::new(items, window)
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        reference: String,
        location: i64,
    }

    impl Located for Item {
        fn reference(&self) -> &str {
            &self.reference
        }
        fn location(&self) -> i64 {
            self.location
        }
    }

    fn item(r: &str, l: i64) -> Item {
        Item {
            reference: r.to_owned(),
            location: l,
        }
    }

    #[test]
    fn never_crosses_reference_boundary() {
        let items = vec![item("chr1", 10), item("chr1", 20), item("chr2", 5)];
        let results: Vec<_> = context_iter(items.into_iter(), Some(100)).collect();
        assert_eq!(results.len(), 3);
        for (current, context) in &results {
            for c in context {
                assert_eq!(c.reference(), current.reference());
            }
        }
    }

    #[test]
    fn window_none_spans_whole_reference() {
        let items = vec![item("chr1", 1), item("chr1", 1000), item("chr1", 2000)];
        let results: Vec<_> = context_iter(items.into_iter(), None).collect();
        assert_eq!(results[0].1.len(), 3);
        assert_eq!(results[1].1.len(), 3);
        assert_eq!(results[2].1.len(), 3);
    }

    #[test]
    fn bounded_window_excludes_far_items() {
        let items = vec![item("chr1", 0), item("chr1", 5), item("chr1", 100)];
        let results: Vec<_> = context_iter(items.into_iter(), Some(10)).collect();
        // window/2 = 5, so item at 0 has context {0, 5}; item at 100 has {100}.
        let ctx_for_0 = &results[0].1;
        assert_eq!(ctx_for_0.len(), 2);
        let ctx_for_100 = &results[2].1;
        assert_eq!(ctx_for_100.len(), 1);
    }
}
