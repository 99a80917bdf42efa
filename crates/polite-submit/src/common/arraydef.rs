use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::common::arrayparser::parse_array_range;

/// Contiguous, inclusive range of array indices, e.g. `0-99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub start: u32,
    pub count: u32,
}

impl IntRange {
    pub fn new(start: u32, count: u32) -> IntRange {
        assert!(count > 0);
        IntRange { start, count }
    }

    /// Creates a range from its inclusive bounds.
    pub fn from_bounds(start: u32, end: u32) -> IntRange {
        assert!(start <= end);
        IntRange::new(start, end - start + 1)
    }

    /// Last index that belongs to the range.
    pub fn end(&self) -> u32 {
        self.start + (self.count - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + use<> {
        self.start..=self.end()
    }

    /// Splits the range into contiguous sub-ranges of at most `chunk_size` indices.
    /// The sub-ranges are returned in ascending order and together cover the range exactly once.
    pub fn chunks(&self, chunk_size: u32) -> impl Iterator<Item = IntRange> + use<> {
        assert!(chunk_size > 0);
        let end = self.end();
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let start = next?;
            let chunk_end = start.saturating_add(chunk_size - 1).min(end);
            next = if chunk_end < end {
                Some(chunk_end + 1)
            } else {
                None
            };
            Some(IntRange::from_bounds(start, chunk_end))
        })
    }
}

impl FromStr for IntRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_array_range(s)
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end())
        }
    }
}

// Serialized by its inclusive bounds
impl Serialize for IntRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut range = serializer.serialize_struct("IntRange", 2)?;
        range.serialize_field("start", &self.start)?;
        range.serialize_field("end", &self.end())?;
        range.end()
    }
}
