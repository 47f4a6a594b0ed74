//! Per-file AST root.

use crate::context::FileHash;

use super::definitions::{
    DataNode, Definition, EntityNode, EnumNode, ErrorNode, FuncNode, FunctionNode, VariantNode,
};

/// Everything parsed out of one source file.
#[derive(Debug, Clone, Default)]
pub struct FileNode {
    pub hash: FileHash,
    pub definitions: Vec<Definition>,
    /// Hashes of the files this one imports, in import order.
    pub imports: Vec<FileHash>,
    /// Names of the imported core modules.
    pub core_imports: Vec<String>,
    /// `use … as ALIAS` bindings.
    pub aliases: Vec<(String, FileHash)>,
    /// Insertion-ordered name → definition index, for named definitions.
    name_index: Vec<(String, usize)>,
}

impl FileNode {
    pub fn new(hash: FileHash) -> Self {
        Self {
            hash,
            ..Self::default()
        }
    }

    /// Append a definition, indexing it by name when it has one.
    pub fn add_definition(&mut self, definition: Definition) {
        if let Some(name) = definition.name() {
            self.name_index
                .push((name.to_string(), self.definitions.len()));
        }
        self.definitions.push(definition);
    }

    pub fn definition_named(&self, name: &str) -> Option<&Definition> {
        self.name_index
            .iter()
            .find(|(indexed, _)| indexed == name)
            .map(|(_, idx)| &self.definitions[*idx])
    }

    pub fn function(&self, name: &str) -> Option<&FunctionNode> {
        self.functions().find(|function| function.name == name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionNode> {
        self.definitions.iter().filter_map(|def| match def {
            Definition::Function(node) => Some(node),
            _ => None,
        })
    }

    pub fn data_module(&self, name: &str) -> Option<&DataNode> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Data(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    pub fn func_module(&self, name: &str) -> Option<&FuncNode> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Func(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    pub fn entity(&self, name: &str) -> Option<&EntityNode> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Entity(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumNode> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Enum(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    pub fn error_set(&self, name: &str) -> Option<&ErrorNode> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Error(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    pub fn variant(&self, name: &str) -> Option<&VariantNode> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Variant(node) if node.name == name => Some(node),
            _ => None,
        })
    }

    pub fn test(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|def| match def {
            Definition::Test(node) => node.name == name,
            _ => false,
        })
    }

    /// Record a file import, collapsing duplicates. Returns false when
    /// the file was already imported.
    pub fn add_import(&mut self, target: FileHash) -> bool {
        if self.imports.contains(&target) {
            return false;
        }
        self.imports.push(target);
        true
    }

    /// Record a core module import, collapsing duplicates.
    pub fn add_core_import(&mut self, module: &str) -> bool {
        if self.core_imports.iter().any(|existing| existing == module) {
            return false;
        }
        self.core_imports.push(module.to_string());
        true
    }

    pub fn alias_target(&self, alias: &str) -> Option<&FileHash> {
        self.aliases
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, hash)| hash)
    }
}
