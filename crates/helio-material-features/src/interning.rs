//! Interned state strings
//!
//! State fingerprints are compared far more often than they are built. The
//! interner hands out one id per distinct string so equality is an integer
//! compare. Ids are scoped to the interner that issued them: strings from
//! different interners, or from before a [`StateInterner::clear`], never
//! compare equal.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

fn next_table_id() -> u32 {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Case-sensitive 32-bit hash of a state string
pub fn state_hash(text: &str) -> u32 {
    xxh3_64(text.as_bytes()) as u32
}

/// Handle to an interned string
#[derive(Clone)]
pub struct InternedStr {
    table: u32,
    id: u32,
    hash: u32,
    text: Arc<str>,
}

impl InternedStr {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// [`state_hash`] of the text, computed once at intern time
    pub fn hash32(&self) -> u32 {
        self.hash
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl PartialEq for InternedStr {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.id == other.id
    }
}

impl Eq for InternedStr {}

impl Hash for InternedStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InternedStr").field(&&*self.text).finish()
    }
}

impl fmt::Display for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

struct Entry {
    id: u32,
    hash: u32,
}

/// String table shared by everything that builds state hints
pub struct StateInterner {
    table: u32,
    entries: Mutex<FxHashMap<Arc<str>, Entry>>,
}

impl StateInterner {
    pub fn new() -> Self {
        Self {
            table: next_table_id(),
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn intern(&self, text: &str) -> InternedStr {
        let mut entries = self.entries.lock();

        if let Some((key, entry)) = entries.get_key_value(text) {
            return InternedStr {
                table: self.table,
                id: entry.id,
                hash: entry.hash,
                text: key.clone(),
            };
        }

        let id = entries.len() as u32;
        let hash = state_hash(text);
        let key: Arc<str> = Arc::from(text);
        entries.insert(key.clone(), Entry { id, hash });
        log::trace!("Interned state #{} ({} bytes)", id, text.len());

        InternedStr {
            table: self.table,
            id,
            hash,
            text: key,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry. Strings interned before this no longer compare
    /// equal to anything interned after it.
    pub fn clear(&mut self) {
        let entries = self.entries.get_mut();
        log::debug!("Clearing state interner ({} entries)", entries.len());
        entries.clear();
        self.table = next_table_id();
    }
}

impl Default for StateInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_interns_to_same_handle() {
        let interner = StateInterner::new();
        let a = interner.intern("[Vert Position]|blend=None|tex=[];");
        let b = interner.intern("[Vert Position]|blend=None|tex=[];");
        let c = interner.intern("[Vert Position]|blend=Add|tex=[];");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.hash32(), b.hash32());
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn hash_is_case_sensitive() {
        assert_ne!(state_hash("Fog"), state_hash("fog"));
    }

    #[test]
    fn handles_are_scoped_to_their_interner() {
        let first = StateInterner::new();
        let second = StateInterner::new();
        assert_ne!(first.intern("state"), second.intern("state"));
    }

    #[test]
    fn clear_invalidates_old_handles() {
        let mut interner = StateInterner::new();
        let before = interner.intern("state");
        interner.clear();
        assert!(interner.is_empty());

        let after = interner.intern("state");
        assert_eq!(before.as_str(), after.as_str());
        assert_ne!(before, after);
    }
}
