//! Duplicate rank diagnostic

use crate::catalog::TypeCatalog;
use crate::order::ExecutionOrder;
use cadence_core::ExecutionRank;
use log::warn;
use std::collections::BTreeMap;
use std::fmt;

/// Two unrelated types ended up with the same rank.
///
/// Not a correctness problem: same-rank instances still run in a stable
/// order. It usually means two types were meant to be ordered against each
/// other and neither says so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRankWarning {
    pub rank: ExecutionRank,
    pub first: String,
    pub second: String,
}

impl fmt::Display for DuplicateRankWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` and `{}` share execution rank {} without being ordered against each other",
            self.first, self.second, self.rank
        )
    }
}

/// Records rank claims and keeps the first collision between unrelated types.
///
/// Rank 0 is shared by every type without dependencies and is not tracked.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    claims: BTreeMap<ExecutionRank, Vec<String>>,
    first_collision: Option<DuplicateRankWarning>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the diagnostic over a whole execution order, in rank-then-name order
    pub fn check(order: &ExecutionOrder, catalog: &TypeCatalog) -> Self {
        let mut registry = Self::new();
        for (type_name, rank) in order.sorted() {
            registry.record(catalog, type_name, rank);
        }
        registry
    }

    /// Record that `type_name` was assigned `rank`.
    ///
    /// Returns the collision if this claim is the first one to produce it.
    pub fn record(
        &mut self,
        catalog: &TypeCatalog,
        type_name: &str,
        rank: ExecutionRank,
    ) -> Option<&DuplicateRankWarning> {
        if rank == ExecutionRank::ZERO {
            return None;
        }

        let claimants = self.claims.entry(rank).or_default();
        if claimants.iter().any(|c| c == type_name) {
            return None;
        }

        let unrelated = claimants
            .iter()
            .find(|other| !catalog.related(other, type_name))
            .cloned();
        claimants.push(type_name.to_string());

        match unrelated {
            Some(other) if self.first_collision.is_none() => {
                let warning = DuplicateRankWarning {
                    rank,
                    first: other,
                    second: type_name.to_string(),
                };
                warn!("{}", warning);
                self.first_collision = Some(warning);
                self.first_collision.as_ref()
            }
            _ => None,
        }
    }

    pub fn first_collision(&self) -> Option<&DuplicateRankWarning> {
        self.first_collision.as_ref()
    }
}
