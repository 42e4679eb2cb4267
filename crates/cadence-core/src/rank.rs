//! Execution rank

use serde::Serialize;
use std::fmt;

/// The execution order value of a participant type.
///
/// Lower ranks run first within every phase. A type with no dependencies has
/// rank 0; any other type ranks one above the highest rank it depends on.
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ExecutionRank(pub u32);

impl ExecutionRank {
    pub const ZERO: ExecutionRank = ExecutionRank(0);
    pub const MAX: ExecutionRank = ExecutionRank(u32::MAX);

    /// The rank one above this one
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ExecutionRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutionRank({})", self.0)
    }
}

impl fmt::Display for ExecutionRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
