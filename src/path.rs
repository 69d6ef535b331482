//! Positional addressing inside a section tree.
//!
//! A section is identified by where it was encountered during a run, not by its
//! name: the Nth section reached at depth D is [`SectionId`] `(D, N)`.
//! A [`PathStack`] strings these indices together from the root, one entry per
//! depth, and tells a replayed run which branch to follow.

use std::{
    fmt::{self, Debug, Display},
    hash::{Hash, Hasher},
};

/// The maximum section nesting depth a [`PathStack`] can encode.
pub const MAX_DEPTH: usize = 32;

/// The highest sibling index a [`PathStack`] can encode per depth.
pub const MAX_INDEX: usize = u8::MAX as usize;

/// Positional identity of a section within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId {
    /// Nesting depth, `0` for sections directly inside the suite body.
    pub depth: usize,

    /// Encounter order among the siblings at `depth`.
    pub index: u8,
}

impl SectionId {
    pub const fn new(depth: usize, index: u8) -> Self {
        Self { depth, index }
    }
}

impl Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.index, self.depth)
    }
}

/// A fixed capacity route through a section tree.
///
/// Entry `d` holds the sibling index to take at depth `d`.
/// An empty stack means "nothing pinned", so every section is entered
/// leftmost first.
///
/// Entries may be written out of order while a path is being discovered
/// (deepest first, then each ancestor on the way out), so [`set`](Self::set)
/// extends the length to cover the written depth.
/// Once the run has unwound to the top, the entries are contiguous from depth 0.
#[derive(Clone, Copy, Default)]
pub struct PathStack {
    len: usize,
    data: [u8; MAX_DEPTH],
}

impl PathStack {
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; MAX_DEPTH],
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The sibling index pinned at `depth`, if the path reaches that deep.
    pub fn get(&self, depth: usize) -> Option<u8> {
        self.as_slice().get(depth).copied()
    }

    /// Write `id.index` at `id.depth`, growing the path to cover that depth.
    ///
    /// # Panics
    /// Panics if `id.depth` is not below [`MAX_DEPTH`].
    /// The execution context checks the depth before any id reaches a path.
    pub fn set(&mut self, id: SectionId) {
        self.data[id.depth] = id.index;
        self.len = self.len.max(id.depth + 1);
    }

    /// Whether this path's last entry is exactly `id`.
    pub fn ends_at(&self, id: SectionId) -> bool {
        self.len == id.depth + 1 && self.get(id.depth) == Some(id.index)
    }

    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = SectionId> + '_ {
        self.as_slice()
            .iter()
            .enumerate()
            .map(|(depth, index)| SectionId::new(depth, *index))
    }
}

// Bytes past `len` are stale and must not take part in comparisons.
impl PartialEq for PathStack {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for PathStack {}

impl Hash for PathStack {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl Debug for PathStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Renders as dash separated indices, `0-2-1`, or nothing for an empty path.
impl Display for PathStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, index) in self.as_slice().iter().enumerate() {
            if depth > 0 {
                f.write_str("-")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

impl<'p> FromIterator<&'p u8> for PathStack {
    fn from_iter<T: IntoIterator<Item = &'p u8>>(iter: T) -> Self {
        let mut path = PathStack::new();
        for (depth, index) in iter.into_iter().enumerate().take(MAX_DEPTH) {
            path.set(SectionId::new(depth, *index));
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_out_of_order_becomes_contiguous() {
        let mut path = PathStack::new();
        path.set(SectionId::new(2, 1));
        assert_eq!(path.len(), 3);

        path.set(SectionId::new(1, 0));
        path.set(SectionId::new(0, 4));
        assert_eq!(path.as_slice(), &[4, 0, 1]);
        assert_eq!(path.to_string(), "4-0-1");
    }

    #[test]
    fn setting_shallower_entry_keeps_length() {
        let mut path: PathStack = [1u8, 2, 3].iter().collect();
        path.set(SectionId::new(0, 7));
        assert_eq!(path.as_slice(), &[7, 2, 3]);
    }

    #[test]
    fn ends_at_only_matches_last_entry() {
        let path: PathStack = [0u8, 3].iter().collect();
        assert!(path.ends_at(SectionId::new(1, 3)));
        assert!(!path.ends_at(SectionId::new(0, 0)));
        assert!(!path.ends_at(SectionId::new(1, 2)));
    }

    #[test]
    fn empty_path_renders_empty() {
        let mut path: PathStack = [5u8].iter().collect();
        path.clear();
        assert!(path.is_empty());
        assert_eq!(path.get(0), None);
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn stale_entries_do_not_affect_equality() {
        let mut a: PathStack = [1u8, 2].iter().collect();
        a.truncate(1);
        let b: PathStack = [1u8].iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn truncate_never_grows() {
        let mut path: PathStack = [1u8, 1].iter().collect();
        path.truncate(5);
        assert_eq!(path.len(), 2);
        path.truncate(1);
        assert_eq!(path.as_slice(), &[1]);
    }
}
