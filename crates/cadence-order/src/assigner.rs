//! Execution rank resolution
//!
//! Each participant type gets the smallest rank strictly greater than every
//! rank it depends on, directly or transitively. Ranks are memoized, so the
//! dependency graph can be entered from any type in any order.
//!
//! Declarations that cannot be honoured (cycles, self references, unknown
//! types, mismatched flag lists) never abort the pass: the offending type
//! resolves to rank 0 and the problem is collected in [`OrderAssigner::errors`].

use crate::catalog::TypeCatalog;
use crate::declaration::{DeclarationTable, OrderDeclaration};
use crate::order::ExecutionOrder;
use crate::registry::OrderRegistry;
use cadence_core::{ConfigurationError, ExecutionRank};
use log::{debug, error};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Resolution state of one type
#[derive(Debug, Clone, Default)]
struct TypeEntry {
    /// `None` while the type's own dependencies are still being resolved
    rank: Option<ExecutionRank>,
    /// Every type this one runs after, transitively
    depends_on: BTreeSet<String>,
}

impl TypeEntry {
    fn resolved(rank: ExecutionRank) -> Self {
        Self {
            rank: Some(rank),
            depends_on: BTreeSet::new(),
        }
    }
}

/// Memoized rank resolver over a [`TypeCatalog`] and its declarations
#[derive(Debug)]
pub struct OrderAssigner {
    catalog: TypeCatalog,
    declarations: BTreeMap<String, OrderDeclaration>,
    entries: HashMap<String, TypeEntry>,
    errors: Vec<ConfigurationError>,
    reported_cycles: HashSet<(String, String)>,
    /// Duplicate-rank diagnostic from the last `resolve_all` in a debug build
    rank_diagnostic: Option<OrderRegistry>,
}

impl OrderAssigner {
    /// Create an assigner over an explicit type catalog with no declarations
    pub fn new(catalog: TypeCatalog) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            catalog.root().to_string(),
            TypeEntry::resolved(ExecutionRank::ZERO),
        );
        Self {
            catalog,
            declarations: BTreeMap::new(),
            entries,
            errors: Vec::new(),
            reported_cycles: HashSet::new(),
            rank_diagnostic: None,
        }
    }

    /// Create an assigner from a declaration table, deriving the catalog from it
    pub fn from_table(table: &DeclarationTable) -> Self {
        let mut assigner = Self::new(table.catalog());
        for declaration in table.iter() {
            assigner
                .declarations
                .insert(declaration.type_name.clone(), declaration.clone());
        }
        assigner
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Add or replace the declaration of a type.
    ///
    /// The type is added to the catalog if it is not known yet. Ranks that were
    /// already resolved stay as they are.
    pub fn declare(&mut self, declaration: OrderDeclaration) {
        if !self.catalog.contains(&declaration.type_name) {
            self.catalog
                .insert(&declaration.type_name, declaration.base.as_deref());
        }
        self.declarations
            .insert(declaration.type_name.clone(), declaration);
    }

    /// Declare and resolve a type in one call
    pub fn resolve_with(
        &mut self,
        type_name: &str,
        dependencies: &[&str],
        include_subclasses: Option<&[bool]>,
        include_base: bool,
    ) -> ExecutionRank {
        let mut declaration = self
            .declarations
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| OrderDeclaration::new(type_name));
        declaration.after = dependencies.iter().map(|d| d.to_string()).collect();
        declaration.include_subclasses = include_subclasses.map(|flags| flags.to_vec());
        declaration.include_base = include_base;
        self.declare(declaration);
        self.resolve(type_name)
    }

    /// Rank of a type, resolving it (and anything it depends on) on first use
    pub fn resolve(&mut self, type_name: &str) -> ExecutionRank {
        let mut trail = Vec::new();
        self.resolve_type(type_name, &mut trail)
    }

    /// Resolve every declared type and every participant type in the catalog.
    ///
    /// Types are visited in name order so error reports are reproducible. In
    /// debug builds the result is also checked for unrelated types that landed
    /// on the same rank.
    pub fn resolve_all(&mut self) -> ExecutionOrder {
        let mut names: BTreeSet<String> = self.declarations.keys().cloned().collect();
        names.extend(
            self.catalog
                .participant_types()
                .into_iter()
                .map(|s| s.to_string()),
        );

        let order: ExecutionOrder = names
            .into_iter()
            .map(|name| {
                let rank = self.resolve(&name);
                (name, rank)
            })
            .collect();

        self.rank_diagnostic = if cfg!(debug_assertions) {
            Some(OrderRegistry::check(&order, &self.catalog))
        } else {
            None
        };
        order
    }

    /// Duplicate-rank diagnostic of the last `resolve_all`; only kept in debug builds
    pub fn rank_diagnostic(&self) -> Option<&OrderRegistry> {
        self.rank_diagnostic.as_ref()
    }

    /// Memoized rank, if the type has been resolved
    pub fn rank_of(&self, type_name: &str) -> Option<ExecutionRank> {
        self.entries.get(type_name).and_then(|e| e.rank)
    }

    /// Recorded transitive dependencies of a resolved type, sorted
    pub fn dependencies_of(&self, type_name: &str) -> Vec<&str> {
        self.entries
            .get(type_name)
            .map(|e| e.depends_on.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Configuration errors collected so far, in the order they were found
    pub fn errors(&self) -> &[ConfigurationError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn resolve_type(&mut self, type_name: &str, trail: &mut Vec<String>) -> ExecutionRank {
        if let Some(entry) = self.entries.get(type_name) {
            if let Some(rank) = entry.rank {
                return rank;
            }
            // Reached again while its own dependencies are still open.
            let from = trail
                .last()
                .cloned()
                .unwrap_or_else(|| type_name.to_string());
            self.report_cycle(type_name, &from);
            return ExecutionRank::ZERO;
        }

        let declaration = self
            .declarations
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| OrderDeclaration::new(type_name));

        if let Err(err) = self.validate(&declaration) {
            self.report(err);
            self.entries
                .insert(type_name.to_string(), TypeEntry::resolved(ExecutionRank::ZERO));
            return ExecutionRank::ZERO;
        }

        let direct = self.direct_dependencies(&declaration);
        let closure = self.closure(&direct);

        // Reserve the entry with its known edges before recursing.
        self.entries.insert(
            type_name.to_string(),
            TypeEntry {
                rank: None,
                depends_on: closure.clone(),
            },
        );

        trail.push(type_name.to_string());
        let mut highest: Option<ExecutionRank> = None;
        let mut cyclic = false;

        for dependency in closure.iter().filter(|d| d.as_str() != type_name) {
            let rank = match self.rank_of(dependency) {
                Some(rank) => rank,
                None => self.resolve_type(dependency, trail),
            };

            let (pending, inherited) = match self.entries.get(dependency) {
                Some(entry) => (entry.rank.is_none(), entry.depends_on.clone()),
                None => (false, BTreeSet::new()),
            };
            let loops_back = inherited.contains(type_name);

            // Edges are recorded even for a cycle so every type on it sees the loop.
            if let Some(entry) = self.entries.get_mut(type_name) {
                entry.depends_on.extend(inherited);
            }

            if pending {
                cyclic = true;
            } else if loops_back {
                self.report_cycle(type_name, dependency);
                cyclic = true;
            } else {
                highest = highest.max(Some(rank));
            }
        }
        trail.pop();

        let rank = if cyclic {
            ExecutionRank::ZERO
        } else {
            highest.map_or(ExecutionRank::ZERO, ExecutionRank::next)
        };

        if let Some(entry) = self.entries.get_mut(type_name) {
            entry.rank = Some(rank);
        }
        debug!("execution rank {} -> {}", type_name, rank);
        rank
    }

    fn validate(&self, declaration: &OrderDeclaration) -> Result<(), ConfigurationError> {
        let type_name = &declaration.type_name;
        if !self.catalog.is_participant(type_name) {
            return Err(ConfigurationError::NotParticipantType(type_name.clone()));
        }

        if let Some(flags) = &declaration.include_subclasses {
            if flags.len() != declaration.after.len() {
                return Err(ConfigurationError::LengthMismatch {
                    type_name: type_name.clone(),
                    dependencies: declaration.after.len(),
                    flags: flags.len(),
                });
            }
        }

        for dependency in &declaration.after {
            if dependency.is_empty() {
                return Err(ConfigurationError::EmptyDependency(type_name.clone()));
            }
            if dependency == type_name {
                return Err(ConfigurationError::SelfDependency(type_name.clone()));
            }
            if dependency != self.catalog.root() && !self.catalog.is_participant(dependency) {
                return Err(ConfigurationError::InvalidDependency {
                    type_name: type_name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    /// Declared dependencies, their requested subclasses, and the base type
    fn direct_dependencies(&self, declaration: &OrderDeclaration) -> BTreeSet<String> {
        let type_name = declaration.type_name.as_str();
        let mut dependencies = BTreeSet::new();

        for (index, dependency) in declaration.after.iter().enumerate() {
            dependencies.insert(dependency.clone());
            if declaration.expands_subclasses(index) {
                for subclass in self.catalog.subclasses_of(dependency) {
                    if subclass != type_name {
                        dependencies.insert(subclass.to_string());
                    }
                }
            }
        }

        if declaration.include_base {
            if let Some(base) = self.catalog.base_of(type_name) {
                if self.catalog.is_participant(base) {
                    dependencies.insert(base.to_string());
                }
            }
        }
        dependencies
    }

    /// Breadth-first expansion over the edges recorded so far
    fn closure(&self, direct: &BTreeSet<String>) -> BTreeSet<String> {
        let mut seen = direct.clone();
        let mut queue: VecDeque<&str> = direct.iter().map(|s| s.as_str()).collect();

        while let Some(current) = queue.pop_front() {
            if let Some(entry) = self.entries.get(current) {
                for next in &entry.depends_on {
                    if seen.insert(next.clone()) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    fn report_cycle(&mut self, first: &str, second: &str) {
        let key = if first <= second {
            (first.to_string(), second.to_string())
        } else {
            (second.to_string(), first.to_string())
        };
        if self.reported_cycles.insert(key) {
            self.report(ConfigurationError::CyclicDependency {
                first: first.to_string(),
                second: second.to_string(),
            });
        }
    }

    fn report(&mut self, err: ConfigurationError) {
        error!("{}; `{}` falls back to rank 0", err, err.type_name());
        self.errors.push(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ROOT_PARTICIPANT;

    fn table(toml: &str) -> DeclarationTable {
        let mut table = DeclarationTable::new();
        table.load_string(toml).unwrap();
        table
    }

    #[test]
    fn test_resolve_all_keeps_rank_diagnostic() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.Logger]
[participant.Pool]
after = ["Logger"]
[participant.Audio]
after = ["Logger"]
"#,
        ));
        assert!(assigner.rank_diagnostic().is_none());
        assigner.resolve_all();

        if cfg!(debug_assertions) {
            let warning = assigner
                .rank_diagnostic()
                .and_then(|registry| registry.first_collision())
                .unwrap();
            assert_eq!(warning.first, "Audio");
            assert_eq!(warning.second, "Pool");
        } else {
            assert!(assigner.rank_diagnostic().is_none());
        }
    }

    #[test]
    fn test_linear_chain() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.Logger]
[participant.Pool]
after = ["Logger"]
[participant.Factory]
after = ["Pool"]
"#,
        ));
        let order = assigner.resolve_all();

        assert_eq!(order.rank_of("Logger"), Some(ExecutionRank(0)));
        assert_eq!(order.rank_of("Pool"), Some(ExecutionRank(1)));
        assert_eq!(order.rank_of("Factory"), Some(ExecutionRank(2)));
        assert!(!assigner.has_errors());
        assert_eq!(assigner.dependencies_of("Factory"), vec!["Logger", "Pool"]);
    }

    #[test]
    fn test_rank_exceeds_every_transitive_dependency() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.A]
[participant.B]
after = ["A"]
[participant.C]
after = ["B"]
[participant.D]
after = ["A"]
[participant.E]
after = ["D", "C"]
[participant.F]
after = ["E", "A"]
"#,
        ));
        let order = assigner.resolve_all();
        assert!(!assigner.has_errors());

        for (name, rank) in order.iter() {
            for dependency in assigner.dependencies_of(name) {
                let dependency_rank = order.rank_of(dependency).unwrap();
                assert!(
                    rank > dependency_rank,
                    "{} ({}) must rank above {} ({})",
                    name,
                    rank,
                    dependency,
                    dependency_rank
                );
            }
        }
        assert_eq!(order.rank_of("E"), Some(ExecutionRank(3)));
        assert_eq!(order.rank_of("F"), Some(ExecutionRank(4)));
    }

    #[test]
    fn test_resolution_order_does_not_matter() {
        let declarations = r#"
[participant.Logger]
[participant.Pool]
after = ["Logger"]
[participant.Factory]
after = ["Pool"]
"#;
        let mut forward = OrderAssigner::from_table(&table(declarations));
        let mut backward = OrderAssigner::from_table(&table(declarations));

        assert_eq!(backward.resolve("Factory"), ExecutionRank(2));
        assert_eq!(backward.rank_of("Logger"), Some(ExecutionRank(0)));
        assert_eq!(forward.resolve_all(), backward.resolve_all());
    }

    #[test]
    fn test_direct_cycle_is_rejected() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.Pool]
after = ["Factory"]
[participant.Factory]
after = ["Pool"]
"#,
        ));
        let order = assigner.resolve_all();

        assert_eq!(order.rank_of("Pool"), Some(ExecutionRank::ZERO));
        assert_eq!(order.rank_of("Factory"), Some(ExecutionRank::ZERO));
        assert_eq!(assigner.errors().len(), 1);
        match &assigner.errors()[0] {
            ConfigurationError::CyclicDependency { first, second } => {
                let mut names = vec![first.as_str(), second.as_str()];
                names.sort();
                assert_eq!(names, vec!["Factory", "Pool"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_transitive_cycle_is_rejected() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.A]
after = ["C"]
[participant.B]
after = ["A"]
[participant.C]
after = ["B"]
[participant.Outside]
"#,
        ));
        let order = assigner.resolve_all();

        assert!(assigner
            .errors()
            .iter()
            .all(|e| matches!(e, ConfigurationError::CyclicDependency { .. })));
        assert!(assigner.has_errors());
        assert_eq!(order.rank_of("A"), Some(ExecutionRank::ZERO));
        assert_eq!(order.rank_of("Outside"), Some(ExecutionRank::ZERO));
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let mut assigner = OrderAssigner::new(TypeCatalog::default());
        let rank = assigner.resolve_with("Logger", &["Logger"], None, true);

        assert_eq!(rank, ExecutionRank::ZERO);
        assert_eq!(
            assigner.errors(),
            &[ConfigurationError::SelfDependency("Logger".into())]
        );
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut assigner = OrderAssigner::new(TypeCatalog::default());
        assigner.declare(OrderDeclaration::new("Logger"));
        let rank = assigner.resolve_with("Pool", &["Logger"], Some(&[true, false]), true);

        assert_eq!(rank, ExecutionRank::ZERO);
        assert!(matches!(
            assigner.errors()[0],
            ConfigurationError::LengthMismatch {
                dependencies: 1,
                flags: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_dependency_degrades_only_that_type() {
        let mut catalog = TypeCatalog::default();
        catalog.insert_foreign("Texture");
        let mut assigner = OrderAssigner::new(catalog);
        assigner.declare(OrderDeclaration::new("Logger"));
        assigner.declare(OrderDeclaration::new("Renderer").after(&["Texture"]));
        assigner.declare(OrderDeclaration::new("Pool").after(&["Logger"]));

        let order = assigner.resolve_all();
        assert_eq!(order.rank_of("Renderer"), Some(ExecutionRank::ZERO));
        assert_eq!(order.rank_of("Pool"), Some(ExecutionRank(1)));
        assert_eq!(
            assigner.errors(),
            &[ConfigurationError::InvalidDependency {
                type_name: "Renderer".into(),
                dependency: "Texture".into(),
            }]
        );
    }

    #[test]
    fn test_non_participant_type_is_rejected() {
        let mut catalog = TypeCatalog::default();
        catalog.insert_foreign("Texture");
        let mut assigner = OrderAssigner::new(catalog);

        assert_eq!(assigner.resolve("Texture"), ExecutionRank::ZERO);
        assert_eq!(
            assigner.errors(),
            &[ConfigurationError::NotParticipantType("Texture".into())]
        );
        // memoized: no second report
        assigner.resolve("Texture");
        assert_eq!(assigner.errors().len(), 1);
    }

    #[test]
    fn test_root_is_a_valid_dependency() {
        let mut assigner = OrderAssigner::new(TypeCatalog::default());
        let rank = assigner.resolve_with("Logger", &[ROOT_PARTICIPANT], None, true);
        assert_eq!(rank, ExecutionRank(1));
        assert!(!assigner.has_errors());
    }

    #[test]
    fn test_base_type_is_a_dependency() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.Widget]
[participant.Button]
base = "Widget"
[participant.RawButton]
base = "Widget"
include_base = false
"#,
        ));
        let order = assigner.resolve_all();

        assert_eq!(order.rank_of("Widget"), Some(ExecutionRank(0)));
        assert_eq!(order.rank_of("Button"), Some(ExecutionRank(1)));
        assert_eq!(order.rank_of("RawButton"), Some(ExecutionRank(0)));
    }

    #[test]
    fn test_subclass_expansion() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.Widget]
include_base = false
[participant.Button]
base = "Widget"
[participant.IconButton]
base = "Button"
[participant.Layout]
after = ["Widget"]
include_subclasses = [true]
[participant.Tooltip]
after = ["Widget"]
"#,
        ));
        let order = assigner.resolve_all();

        assert_eq!(order.rank_of("IconButton"), Some(ExecutionRank(2)));
        assert_eq!(order.rank_of("Layout"), Some(ExecutionRank(3)));
        assert_eq!(order.rank_of("Tooltip"), Some(ExecutionRank(1)));
        assert!(!assigner.has_errors());
    }

    #[test]
    fn test_subclass_expansion_skips_the_declaring_type() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.Widget]
[participant.Panel]
base = "Widget"
include_base = false
after = ["Widget"]
include_subclasses = [true]
[participant.Button]
base = "Widget"
"#,
        ));
        let order = assigner.resolve_all();

        assert!(!assigner.has_errors());
        assert_eq!(order.rank_of("Panel"), Some(ExecutionRank(2)));
    }

    #[test]
    fn test_memoized_rank_is_immutable() {
        let mut assigner = OrderAssigner::new(TypeCatalog::default());
        assigner.declare(OrderDeclaration::new("Logger"));
        assert_eq!(assigner.resolve("Logger"), ExecutionRank(0));

        assigner.declare(OrderDeclaration::new("Clock"));
        assigner.declare(OrderDeclaration::new("Logger").after(&["Clock"]));
        assert_eq!(assigner.resolve("Logger"), ExecutionRank(0));
    }

    #[test]
    fn test_dependents_of_a_cycle_still_resolve() {
        let mut assigner = OrderAssigner::from_table(&table(
            r#"
[participant.A]
after = ["B"]
[participant.B]
after = ["A"]
[participant.Consumer]
after = ["A"]
"#,
        ));
        let order = assigner.resolve_all();
        assert_eq!(order.rank_of("Consumer"), Some(ExecutionRank(1)));
    }
}
