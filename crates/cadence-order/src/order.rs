//! Resolved execution order table

use cadence_core::ExecutionRank;
use serde::Serialize;
use std::collections::BTreeMap;

/// Immutable type → rank table produced by one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionOrder {
    ranks: BTreeMap<String, ExecutionRank>,
}

impl ExecutionOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rank of a type directly (hand-built tables and tests)
    pub fn insert(&mut self, type_name: &str, rank: ExecutionRank) {
        self.ranks.insert(type_name.to_string(), rank);
    }

    pub fn rank_of(&self, type_name: &str) -> Option<ExecutionRank> {
        self.ranks.get(type_name).copied()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.ranks.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Types in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ExecutionRank)> {
        self.ranks.iter().map(|(name, rank)| (name.as_str(), *rank))
    }

    /// Types in execution order: by rank, then by name
    pub fn sorted(&self) -> Vec<(&str, ExecutionRank)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|(a_name, a_rank), (b_name, b_rank)| {
            a_rank.cmp(b_rank).then_with(|| a_name.cmp(b_name))
        });
        entries
    }
}

impl FromIterator<(String, ExecutionRank)> for ExecutionOrder {
    fn from_iter<I: IntoIterator<Item = (String, ExecutionRank)>>(iter: I) -> Self {
        Self {
            ranks: iter.into_iter().collect(),
        }
    }
}
