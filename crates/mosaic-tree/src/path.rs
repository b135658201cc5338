//! Path addressing into the component forest
//!
//! A [`TreePath`] is an ordered list of `(slot, index)` segments. The first
//! segment's slot names a region and its index selects among that region's
//! roots; every later segment descends into a named slot of the node
//! selected so far. The same shape addresses both existing nodes and
//! insertion points (where the final index may equal the sibling count).

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// One step of a [`TreePath`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Region name for the first segment, slot name afterwards
    pub slot: String,
    /// Sibling index within the slot
    pub index: usize,
}

impl PathSegment {
    /// Create a segment
    #[inline]
    #[must_use]
    pub fn new(slot: impl Into<String>, index: usize) -> Self {
        Self {
            slot: slot.into(),
            index,
        }
    }
}

/// Ordered sibling-index path from a region root
///
/// # Invariants
/// - Always holds at least one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PathSegment>", into = "Vec<PathSegment>")]
pub struct TreePath {
    segments: Vec<PathSegment>,
}

impl TryFrom<Vec<PathSegment>> for TreePath {
    type Error = TreeError;

    fn try_from(segments: Vec<PathSegment>) -> Result<Self, Self::Error> {
        Self::from_segments(segments)
    }
}

impl From<TreePath> for Vec<PathSegment> {
    fn from(path: TreePath) -> Self {
        path.segments
    }
}

impl TreePath {
    /// Path addressing position `index` among a region's roots
    #[inline]
    #[must_use]
    pub fn region(region: impl Into<String>, index: usize) -> Self {
        Self {
            segments: vec![PathSegment::new(region, index)],
        }
    }

    /// Build a path from raw segments
    ///
    /// # Errors
    /// Returns [`TreeError::EmptyPath`] if `segments` is empty.
    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self, TreeError> {
        if segments.is_empty() {
            return Err(TreeError::EmptyPath);
        }
        Ok(Self { segments })
    }

    /// Extend the path by descending into `slot` at `index`
    #[inline]
    #[must_use]
    pub fn child(mut self, slot: impl Into<String>, index: usize) -> Self {
        self.segments.push(PathSegment::new(slot, index));
        self
    }

    /// Region name (first segment's slot)
    #[inline]
    #[must_use]
    pub fn region_name(&self) -> &str {
        &self.segments[0].slot
    }

    /// All segments in order
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Final segment (the addressed slot and index)
    #[inline]
    #[must_use]
    pub fn last(&self) -> &PathSegment {
        &self.segments[self.segments.len() - 1]
    }

    /// Segments leading up to, but not including, the final one
    #[inline]
    #[must_use]
    pub fn ancestors(&self) -> &[PathSegment] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl Display for TreePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}[{}]", segment.slot, segment.index)?;
        }
        Ok(())
    }
}

/// Direction for sibling shifts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    /// Swap with the previous sibling
    Earlier,
    /// Swap with the next sibling
    Later,
}
