//! Line coordinates and successor sets.
//!
//! `Pos` is the canonical `(file, line)` coordinate used as the key of every
//! table in the engine. `PosSet` is the value type of the successor tables:
//! either a finite set of positions or the absorbing `Any`.

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;

/// Mask for the intra-function half of a group tag.
pub const GROUP_MASK: u64 = (1 << 32) - 1;

/// A source coordinate. The sentinel `("", -1)` denotes exit from the
/// current function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Pos {
    pub file: String,
    pub line: i64,
}

impl Pos {
    pub fn new(file: impl Into<String>, line: i64) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The end-of-function marker.
    pub fn function_exit() -> Self {
        Self {
            file: String::new(),
            line: -1,
        }
    }

    pub fn is_function_exit(&self) -> bool {
        self.file.is_empty() && self.line == -1
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_function_exit() {
            write!(f, "ret")
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// A set of acceptable positions: either finite, or `Any` (every position
/// is acceptable). `Any` absorbs insertions and contains everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PosSet {
    Finite(FxHashSet<Pos>),
    Any,
}

impl Default for PosSet {
    fn default() -> Self {
        PosSet::Finite(FxHashSet::default())
    }
}

impl PosSet {
    pub fn insert(&mut self, pos: Pos) {
        if let PosSet::Finite(set) = self {
            set.insert(pos);
        }
    }

    pub fn contains(&self, pos: &Pos) -> bool {
        match self {
            PosSet::Finite(set) => set.contains(pos),
            PosSet::Any => true,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, PosSet::Any)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PosSet::Finite(set) => set.is_empty(),
            PosSet::Any => false,
        }
    }

    /// The finite members, in arbitrary order. Empty for `Any`.
    pub fn iter(&self) -> impl Iterator<Item = &Pos> + '_ {
        let set = match self {
            PosSet::Finite(set) => Some(set),
            PosSet::Any => None,
        };
        set.into_iter().flatten()
    }
}

/// Span of a function declaration in the source, recorded when the engine
/// matches a declaration against a symbol from the executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncSpan {
    pub start: Pos,
    pub end: Pos,
}

/// The top-level function identifier packed in a group tag.
pub fn group_fn_id(tag: u64) -> u64 {
    tag >> 32
}

/// The intra-function group number packed in a group tag.
pub fn group_number(tag: u64) -> u64 {
    tag & GROUP_MASK
}

/// Whether two group tags belong to the same top-level function.
pub fn same_function(a: u64, b: u64) -> bool {
    a >> 32 == b >> 32
}
