//! Ordering declarations and the table that loads them

use crate::catalog::{TypeCatalog, ROOT_PARTICIPANT};
use cadence_core::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Ordering input for one participant type, supplied once per type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeclaration {
    pub type_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Base type; `None` means the root participant type
    #[serde(default)]
    pub base: Option<String>,
    /// Types this one must run after
    #[serde(default)]
    pub after: Vec<String>,
    /// Per-dependency flag: also run after every subclass of that dependency
    #[serde(default)]
    pub include_subclasses: Option<Vec<bool>>,
    /// Also run after the base type when it is itself a participant type
    #[serde(default = "default_include_base")]
    pub include_base: bool,
}

fn default_include_base() -> bool {
    true
}

impl OrderDeclaration {
    /// A type with no ordering constraints deriving from the root
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            description: None,
            base: None,
            after: Vec::new(),
            include_subclasses: None,
            include_base: true,
        }
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    /// Run after each of `types`
    pub fn after(mut self, types: &[&str]) -> Self {
        self.after.extend(types.iter().map(|t| t.to_string()));
        self
    }

    pub fn include_subclasses(mut self, flags: &[bool]) -> Self {
        self.include_subclasses = Some(flags.to_vec());
        self
    }

    pub fn include_base(mut self, include: bool) -> Self {
        self.include_base = include;
        self
    }

    /// Whether dependency `index` should expand to its subclasses
    pub fn expands_subclasses(&self, index: usize) -> bool {
        self.include_subclasses
            .as_ref()
            .and_then(|flags| flags.get(index).copied())
            .unwrap_or(false)
    }
}

/// TOML file format for ordering declarations
#[derive(Debug, Deserialize)]
pub struct DeclarationFile {
    #[serde(default)]
    pub participant: BTreeMap<String, DeclarationDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct DeclarationDefinition {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub include_subclasses: Option<Vec<bool>>,
    #[serde(default = "default_include_base")]
    pub include_base: bool,
}

impl DeclarationDefinition {
    fn into_declaration(self, type_name: String) -> OrderDeclaration {
        OrderDeclaration {
            type_name,
            description: self.description,
            base: self.base,
            after: self.after,
            include_subclasses: self.include_subclasses,
            include_base: self.include_base,
        }
    }
}

/// Every ordering declaration known to the process, keyed by type name
#[derive(Debug, Clone, Default)]
pub struct DeclarationTable {
    declarations: BTreeMap<String, OrderDeclaration>,
}

impl DeclarationTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load declarations from a directory structure
    ///
    /// Expects `path/participants/*.toml`. Files are read in name order so a
    /// later file overriding an earlier declaration does so deterministically.
    pub fn load_from_directory<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut table = Self::new();
        table.load_directory(path)?;
        Ok(table)
    }

    /// Load a single directory into this table (additive/override)
    pub fn load_directory<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let participants_path = path.as_ref().join("participants");
        if !participants_path.exists() {
            return Ok(());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&participants_path)? {
            let file_path = entry?.path();
            if file_path.extension().map(|e| e == "toml").unwrap_or(false) {
                files.push(file_path);
            }
        }
        files.sort();

        for file_path in files {
            self.load_file(&file_path)?;
        }
        Ok(())
    }

    /// Load a file or, when `path` is a directory, its `participants/` folder
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load_from_directory(path)
        } else {
            let mut table = Self::new();
            table.load_file(path)?;
            Ok(table)
        }
    }

    /// Load declarations from a TOML file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = fs::read_to_string(path)?;
        self.load_string(&content)
    }

    /// Load declarations from a TOML string
    pub fn load_string(&mut self, content: &str) -> Result<()> {
        let file: DeclarationFile = toml::from_str(content).map_err(|e| {
            CadenceError::DeclarationLoadError(format!("Failed to parse declaration TOML: {}", e))
        })?;

        if file.participant.contains_key(ROOT_PARTICIPANT) {
            return Err(CadenceError::DeclarationLoadError(format!(
                "`{}` is the root participant type and cannot be redeclared",
                ROOT_PARTICIPANT
            )));
        }

        for (name, def) in file.participant {
            self.declarations
                .insert(name.clone(), def.into_declaration(name));
        }

        Ok(())
    }

    /// Register a declaration directly, replacing any earlier one for the same type
    pub fn register(&mut self, declaration: OrderDeclaration) {
        self.declarations
            .insert(declaration.type_name.clone(), declaration);
    }

    pub fn get(&self, type_name: &str) -> Option<&OrderDeclaration> {
        self.declarations.get(type_name)
    }

    /// Declarations in type name order
    pub fn iter(&self) -> impl Iterator<Item = &OrderDeclaration> {
        self.declarations.values()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Build the type hierarchy implied by the declared base types
    pub fn catalog(&self) -> TypeCatalog {
        let mut catalog = TypeCatalog::new(ROOT_PARTICIPANT);
        for declaration in self.declarations.values() {
            catalog.insert(&declaration.type_name, declaration.base.as_deref());
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARATIONS: &str = r#"
[participant.Logger]
description = "Writes diagnostics"

[participant.Pool]
after = ["Logger"]

[participant.Widget]
include_base = false

[participant.Button]
base = "Widget"
after = ["Pool", "Widget"]
include_subclasses = [false, true]
"#;

    #[test]
    fn test_load_string() {
        let mut table = DeclarationTable::new();
        table.load_string(DECLARATIONS).unwrap();

        assert_eq!(table.len(), 4);
        let logger = table.get("Logger").unwrap();
        assert_eq!(logger.description.as_deref(), Some("Writes diagnostics"));
        assert!(logger.include_base);

        let button = table.get("Button").unwrap();
        assert_eq!(button.base.as_deref(), Some("Widget"));
        assert_eq!(button.after, vec!["Pool", "Widget"]);
        assert!(!button.expands_subclasses(0));
        assert!(button.expands_subclasses(1));
        assert!(!table.get("Widget").unwrap().include_base);
    }

    #[test]
    fn test_catalog_from_table() {
        let mut table = DeclarationTable::new();
        table.load_string(DECLARATIONS).unwrap();
        let catalog = table.catalog();

        assert!(catalog.is_participant("Button"));
        assert_eq!(catalog.base_of("Pool"), Some(ROOT_PARTICIPANT));
        assert_eq!(catalog.subclasses_of("Widget"), vec!["Button"]);
    }

    #[test]
    fn test_root_cannot_be_redeclared() {
        let mut table = DeclarationTable::new();
        let result = table.load_string("[participant.Participant]\n");
        assert!(matches!(result, Err(CadenceError::DeclarationLoadError(_))));
    }

    #[test]
    fn test_rejected_file_leaves_table_unchanged() {
        let mut table = DeclarationTable::new();
        table.load_string("[participant.Logger]\n").unwrap();

        let result = table.load_string(
            "[participant.Audio]\n[participant.Participant]\n[participant.Zed]\n",
        );
        assert!(result.is_err());
        assert_eq!(table.len(), 1);
        assert!(table.get("Audio").is_none());
        assert!(table.get("Zed").is_none());
    }

    #[test]
    fn test_malformed_toml() {
        let mut table = DeclarationTable::new();
        let result = table.load_string("[participant.Pool]\nafter = 3\n");
        assert!(matches!(result, Err(CadenceError::DeclarationLoadError(_))));
    }

    #[test]
    fn test_builder() {
        let declaration = OrderDeclaration::new("Factory")
            .with_base("Pool")
            .after(&["Logger"])
            .include_subclasses(&[true])
            .include_base(false);
        assert_eq!(declaration.base.as_deref(), Some("Pool"));
        assert!(declaration.expands_subclasses(0));
        assert!(!declaration.expands_subclasses(4));
        assert!(!declaration.include_base);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!(
            "cadence_declarations_{}",
            std::process::id()
        ));
        let participants = dir.join("participants");
        fs::create_dir_all(&participants).unwrap();
        fs::write(participants.join("a.toml"), "[participant.Logger]\n").unwrap();
        fs::write(
            participants.join("b.toml"),
            "[participant.Pool]\nafter = [\"Logger\"]\n",
        )
        .unwrap();
        fs::write(participants.join("notes.txt"), "ignored").unwrap();

        let table = DeclarationTable::load_path(&dir).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Pool").unwrap().after, vec!["Logger"]);

        let _ = fs::remove_dir_all(&dir);
    }
}
