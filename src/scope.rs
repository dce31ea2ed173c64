/// Open scope names and the output offset at which each one began.
///
/// Scopes nest: `fold` closes them most-recent-first, moving every item
/// appended since a scope opened into a single group item. A scope that
/// collected nothing disappears.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTracker {
    names: Vec<String>,
    offsets: Vec<usize>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `name` at `offset`, the current length of the output it scopes.
    pub fn open(&mut self, name: impl Into<String>, offset: usize) {
        debug_assert!(self.offsets.last().map_or(true, |&last| last <= offset));
        self.names.push(name.into());
        self.offsets.push(offset);
    }

    /// Names of the open scopes, outermost first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Close every scope over `items`, innermost first.
    ///
    /// `make_group` receives a scope name and the items it collected and
    /// returns the single item that replaces them.
    pub fn fold<T, F>(&self, items: &mut Vec<T>, mut make_group: F)
    where
        F: FnMut(&str, Vec<T>) -> T,
    {
        for (name, &offset) in self.names.iter().zip(&self.offsets).rev() {
            // A scope can't hold more than was appended after it opened.
            if offset >= items.len() {
                continue;
            }
            let members = items.split_off(offset);
            items.push(make_group(name, members));
        }
    }
}
