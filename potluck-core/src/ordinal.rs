//! Editable lists whose display order comes from a persisted ordinal.
//!
//! Entries are stored in insertion order, but that order is never exposed:
//! [`OrdinalList::iter`] always yields entries sorted by ordinal. Each entry
//! also gets an [`EntryKey`] that identifies it on the client for as long as
//! the list lives, independent of both its ordinal and any server id.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A record carrying its own sequence position.
pub trait Ordinal {
    fn ordinal(&self) -> u32;
    fn set_ordinal(&mut self, ordinal: u32);
}

/// Client-side identity of a list entry. Never reused within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(u64);

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<T> {
    key: EntryKey,
    value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrdinalList<T> {
    entries: Vec<Entry<T>>,
    next_key: u64,
}

impl<T> Default for OrdinalList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_key: 0,
        }
    }
}

impl<T: Ordinal> OrdinalList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh_key(&mut self) -> EntryKey {
        let key = EntryKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Insert an entry keeping whatever ordinal it already has.
    fn push_raw(&mut self, value: T) -> EntryKey {
        let key = self.fresh_key();
        self.entries.push(Entry { key, value });
        key
    }

    /// One past the highest ordinal, and at least the current length. `None`
    /// when that does not fit in a `u32`.
    fn next_ordinal(&self) -> Option<u32> {
        let len = u32::try_from(self.entries.len()).ok()?;
        self.entries.iter().try_fold(len, |next, e| {
            Some(next.max(e.value.ordinal().checked_add(1)?))
        })
    }

    /// Append at the end of ordinal order.
    ///
    /// The new ordinal is the current length, or one past the highest ordinal
    /// if the list came in with gaps, so it never collides with an existing one.
    /// If the highest ordinal is already `u32::MAX` the list is compacted to
    /// `0..len` first, keeping render order.
    pub fn append(&mut self, mut value: T) -> EntryKey {
        let next = match self.next_ordinal() {
            Some(next) => next,
            None => {
                self.renumber();
                u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
            }
        };
        value.set_ordinal(next);
        self.push_raw(value)
    }

    /// Storage indices sorted by ordinal, ties broken by insertion order.
    fn render_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.entries.len()).collect();
        indices.sort_by_key(|&i| self.entries[i].value.ordinal());
        indices
    }

    /// Remove the entry at `position` in render order. Other ordinals are left
    /// untouched.
    pub fn remove_at(&mut self, position: usize) -> Option<T> {
        let index = *self.render_indices().get(position)?;
        Some(self.entries.remove(index).value)
    }

    /// Remove the highest-ordinal entry.
    pub fn remove_last(&mut self) -> Option<T> {
        let last = self.entries.len().checked_sub(1)?;
        self.remove_at(last)
    }

    /// Entries in render (ordinal-ascending) order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.render_indices()
            .into_iter()
            .map(move |i| &self.entries[i].value)
    }

    /// Entries in render order together with their client keys.
    pub fn iter_keyed(&self) -> impl Iterator<Item = (EntryKey, &T)> + '_ {
        self.render_indices().into_iter().map(move |i| {
            let entry = &self.entries[i];
            (entry.key, &entry.value)
        })
    }

    pub fn keys(&self) -> Vec<EntryKey> {
        self.iter_keyed().map(|(k, _)| k).collect()
    }

    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|e| e.key == key)
            .map(|e| &mut e.value)
    }

    /// Compact ordinals to `0..len` following the current render order.
    pub fn renumber(&mut self) {
        for (ordinal, index) in self.render_indices().into_iter().enumerate() {
            let ordinal = u32::try_from(ordinal).unwrap_or(u32::MAX);
            self.entries[index].value.set_ordinal(ordinal);
        }
    }

    /// True when ordinals are exactly `0..len` with no gaps or repeats.
    pub fn is_contiguous(&self) -> bool {
        self.iter()
            .enumerate()
            .all(|(i, v)| u32::try_from(i).is_ok_and(|i| v.ordinal() == i))
    }
}

impl<T: Ordinal> From<Vec<T>> for OrdinalList<T> {
    fn from(values: Vec<T>) -> Self {
        let mut list = Self::new();
        for value in values {
            list.push_raw(value);
        }
        list
    }
}

impl<T: Ordinal> FromIterator<T> for OrdinalList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: Ordinal + Serialize> Serialize for OrdinalList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Ordinal + Deserialize<'de>> Deserialize<'de> for OrdinalList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from)
    }
}
