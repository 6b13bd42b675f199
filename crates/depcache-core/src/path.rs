//! Path segments and the traversal path stack

use serde::{Deserialize, Serialize};

/// Structural category of a path segment
///
/// The discriminants are persisted as a single byte and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PathSegmentKind {
    GameObject = 0,
    Component = 1,
    Property = 2,
    Unknown = 3,
}

impl PathSegmentKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Map a persisted byte back to a kind. Unknown bytes yield `None`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::GameObject),
            1 => Some(Self::Component),
            2 => Some(Self::Property),
            3 => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for PathSegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GameObject => "game_object",
            Self::Component => "component",
            Self::Property => "property",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One step of a discovery path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub name: String,
    pub kind: PathSegmentKind,
}

impl PathSegment {
    pub fn new(name: impl Into<String>, kind: PathSegmentKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn game_object(name: impl Into<String>) -> Self {
        Self::new(name, PathSegmentKind::GameObject)
    }

    pub fn component(name: impl Into<String>) -> Self {
        Self::new(name, PathSegmentKind::Component)
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self::new(name, PathSegmentKind::Property)
    }
}

/// Path of segments currently entered by a traversal
///
/// Segments can only be pushed through [`PathStack::scoped`], which pops the
/// segment again once the closure returns. A path recorded on a dependency is
/// therefore always the live route from the item root to the current field.
#[derive(Debug, Clone, Default)]
pub struct PathStack {
    segments: Vec<PathSegment>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }

    /// Push `segment`, run `f`, then pop the segment.
    pub fn scoped<R>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push(segment);
        let depth = self.segments.len();
        let result = f(self);
        debug_assert_eq!(self.segments.len(), depth, "unbalanced path stack");
        self.pop();
        result
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments from root to leaf
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Snapshot of the current path, root first
    pub fn to_path(&self) -> Vec<PathSegment> {
        self.segments.clone()
    }
}
