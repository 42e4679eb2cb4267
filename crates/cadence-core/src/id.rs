//! Participant instance identifiers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one participant instance for as long as the process runs.
///
/// Used as the last tie-break between instances that share a rank, a type
/// name and a path, so snapshot order stays total.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Create a new unique InstanceId
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let id1 = InstanceId::new();
        let id2 = InstanceId::new();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_display() {
        assert_eq!(InstanceId(42).to_string(), "#42");
        assert_eq!(format!("{:?}", InstanceId(7)), "InstanceId(7)");
    }
}
