//! String interner for identifier and tag names.
//!
//! Every identifier, attribute name, and tag name in a parsed template is
//! interned once; the rest of the pipeline compares `Name`s (a single u32
//! comparison) instead of strings.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Interned string handle.
///
/// `Name` is only meaningful relative to the interner that produced it.
/// Index 0 is always the empty string.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
    /// The pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Raw index, for use as a dense map key.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

struct InternerState {
    map: FxHashMap<Arc<str>, u32>,
    strings: Vec<Arc<str>>,
}

/// Thread-safe string interner.
///
/// A single `RwLock` over the whole table: reads (lookups and repeat interns)
/// take the read lock, only first-time interns take the write lock. Templates
/// intern a few hundred names at most, so contention is not a concern.
pub struct StringInterner {
    state: RwLock<InternerState>,
}

/// Interner shared between the parser and any number of executions.
pub type SharedInterner = Arc<StringInterner>;

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        let mut map = FxHashMap::default();
        map.insert(Arc::clone(&empty), 0);
        StringInterner {
            state: RwLock::new(InternerState {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&self, s: &str) -> Name {
        {
            let guard = self.state.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name(idx);
            }
        }
        let mut guard = self.state.write();
        // Re-check: another thread may have interned between the locks.
        if let Some(&idx) = guard.map.get(s) {
            return Name(idx);
        }
        let idx = u32::try_from(guard.strings.len()).unwrap_or(u32::MAX);
        let arc: Arc<str> = Arc::from(s);
        guard.strings.push(Arc::clone(&arc));
        guard.map.insert(arc, idx);
        Name(idx)
    }

    /// Look up the string for a `Name`.
    ///
    /// Returns the empty string for a `Name` from a different interner whose
    /// index is out of range.
    pub fn lookup(&self, name: Name) -> Arc<str> {
        let guard = self.state.read();
        guard
            .strings
            .get(name.0 as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from(""))
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.state.read().strings.len()
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let interner = StringInterner::new();
        let a = interner.intern("session");
        let b = interner.intern("session");
        assert_eq!(a, b);
        assert_eq!(&*interner.lookup(a), "session");
    }

    #[test]
    fn test_empty_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
    }

    #[test]
    fn test_distinct_names() {
        let interner = StringInterner::new();
        assert_ne!(interner.intern("a"), interner.intern("b"));
    }
}
