use core::{fmt, num::NonZeroU64};

use bytes::Bytes;

use crate::codec::encode_item;

/// One value of a [`Sequence`]: a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceItem(NonZeroU64);

impl SequenceItem {
    /// The integer carried by this item.
    pub const fn value(self) -> u64 {
        self.0.get()
    }

    /// Wire form of the item: its decimal digits followed by `\n`.
    pub fn encode(self) -> Bytes {
        encode_item(self.value())
    }
}

impl fmt::Display for SequenceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lazy counter yielding `1, 2, 3, ...`.
///
/// Every value is produced exactly once and in order. Instead of wrapping
/// past `u64::MAX` the sequence reports exhaustion, which is the only way it
/// ends on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    next: Option<NonZeroU64>,
}

impl Sequence {
    /// A fresh sequence starting at 1.
    pub const fn new() -> Self {
        Self {
            next: Some(NonZeroU64::MIN),
        }
    }

    /// A sequence whose first item is `first`.
    pub const fn starting_at(first: NonZeroU64) -> Self {
        Self { next: Some(first) }
    }

    /// Returns the next item, or `None` once the counter is exhausted.
    pub fn next_item(&mut self) -> Option<SequenceItem> {
        let current = self.next?;
        self.next = current.checked_add(1);
        Some(SequenceItem(current))
    }

    /// The value the next call to [`Sequence::next_item`] would return.
    pub fn peek(&self) -> Option<u64> {
        self.next.map(NonZeroU64::get)
    }

    pub const fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Sequence {
    type Item = SequenceItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item()
    }
}
