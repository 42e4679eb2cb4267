//! Participant type hierarchy

use std::collections::{BTreeMap, HashSet};

/// Name of the designated root participant type.
///
/// Every participant type descends from it. The root itself is abstract: it
/// may be named as a dependency but never counts as a participant base type.
pub const ROOT_PARTICIPANT: &str = "Participant";

/// Explicit registry of known types and their base types.
///
/// Stands in for runtime type scanning: subclass queries only see types that
/// were inserted here.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    root: String,
    bases: BTreeMap<String, Option<String>>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new(ROOT_PARTICIPANT)
    }
}

impl TypeCatalog {
    /// Create a catalog whose participant types descend from `root`
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            bases: BTreeMap::new(),
        }
    }

    /// Name of the root participant type
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Register a type. `None` as base means it derives directly from the root.
    pub fn insert(&mut self, name: &str, base: Option<&str>) {
        let base = base.unwrap_or(&self.root).to_string();
        self.bases.insert(name.to_string(), Some(base));
    }

    /// Register a type that has no base type at all (never a participant)
    pub fn insert_foreign(&mut self, name: &str) {
        self.bases.insert(name.to_string(), None);
    }

    /// Whether the type was registered (the root counts as known)
    pub fn contains(&self, name: &str) -> bool {
        name == self.root || self.bases.contains_key(name)
    }

    /// Direct base type of a registered type
    pub fn base_of(&self, name: &str) -> Option<&str> {
        self.bases.get(name).and_then(|b| b.as_deref())
    }

    /// A participant type is a strict descendant of the root.
    pub fn is_participant(&self, name: &str) -> bool {
        name != self.root && self.is_subclass_of(name, &self.root)
    }

    /// Whether `sub` strictly derives from `sup`, directly or through its base chain
    pub fn is_subclass_of(&self, sub: &str, sup: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = sub;
        while let Some(base) = self.base_of(current) {
            if base == sup {
                return true;
            }
            // a malformed chain that loops back on itself never reaches `sup`
            if !seen.insert(base) {
                return false;
            }
            current = base;
        }
        false
    }

    /// Every known type deriving from `name`, sorted by name
    pub fn subclasses_of(&self, name: &str) -> Vec<&str> {
        self.bases
            .keys()
            .filter(|candidate| self.is_subclass_of(candidate, name))
            .map(|s| s.as_str())
            .collect()
    }

    /// All registered participant types, sorted by name
    pub fn participant_types(&self) -> Vec<&str> {
        self.bases
            .keys()
            .filter(|name| self.is_participant(name))
            .map(|s| s.as_str())
            .collect()
    }

    /// All registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        self.bases.keys().map(|s| s.as_str()).collect()
    }

    /// Whether either type derives from the other
    pub fn related(&self, a: &str, b: &str) -> bool {
        self.is_subclass_of(a, b) || self.is_subclass_of(b, a)
    }
}
