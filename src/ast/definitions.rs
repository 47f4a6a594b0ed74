//! Top-level definition nodes.
//!
//! Every node carries a [`NodeInfo`] with its file hash and position so
//! diagnostics can point back into the source.

use std::sync::Arc;

use crate::context::FileHash;
use crate::types::Type;

use super::expressions::Expression;
use super::scope::ScopeArena;
use super::statements::Statement;

/// Position block shared by all definition nodes.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub file: FileHash,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl NodeInfo {
    pub fn new(file: FileHash, line: u32, column: u32, length: u32) -> Self {
        Self {
            file,
            line,
            column,
            length,
        }
    }
}

/// Target of a `use` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportPath {
    /// `use "relative/path.ft"`, resolved against the importing file.
    File(String),
    /// `use Core.x` / `use a.b.c` dotted module references.
    Lib(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub info: NodeInfo,
    pub path: ImportPath,
    pub alias: Option<String>,
    /// Hash of the imported file, set for file imports.
    pub target: Option<FileHash>,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub ty: Arc<Type>,
    pub name: String,
    pub is_mut: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub info: NodeInfo,
    pub name: String,
    pub is_aligned: bool,
    pub is_const: bool,
    pub parameters: Vec<Parameter>,
    pub return_types: Vec<Arc<Type>>,
    /// Error set named after the return types, if any.
    pub error_set: Option<String>,
    pub scopes: ScopeArena,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct DataField {
    pub name: String,
    pub ty: Arc<Type>,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct DataNode {
    pub info: NodeInfo,
    pub name: String,
    pub is_shared: bool,
    pub is_immutable: bool,
    pub is_aligned: bool,
    pub fields: Vec<DataField>,
    /// Field order of the generated constructor.
    pub constructor_order: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FuncNode {
    pub info: NodeInfo,
    pub name: String,
    /// `(data module, binding name)` pairs of the requires clause.
    pub required_data: Vec<(String, String)>,
    pub functions: Vec<FunctionNode>,
}

/// `a::b -> c::d` mapping inside an entity's link section.
#[derive(Debug, Clone)]
pub struct LinkNode {
    pub info: NodeInfo,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EntityNode {
    pub info: NodeInfo,
    pub name: String,
    /// Monolithic entities inline their modules as `<Name>__D` /
    /// `<Name>__F` definitions.
    pub is_monolithic: bool,
    pub data_modules: Vec<String>,
    pub func_modules: Vec<String>,
    pub links: Vec<LinkNode>,
    pub extends: Vec<(String, String)>,
    pub constructor_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EnumNode {
    pub info: NodeInfo,
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub info: NodeInfo,
    pub name: String,
    pub parent: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VariantNode {
    pub info: NodeInfo,
    pub name: String,
    pub types: Vec<Arc<Type>>,
}

#[derive(Debug, Clone)]
pub struct TestNode {
    pub info: NodeInfo,
    pub name: String,
    pub scopes: ScopeArena,
    pub body: Vec<Statement>,
}

/// Any top-level named construct.
#[derive(Debug, Clone)]
pub enum Definition {
    Import(ImportNode),
    Function(FunctionNode),
    Data(DataNode),
    Func(FuncNode),
    Entity(EntityNode),
    Enum(EnumNode),
    Error(ErrorNode),
    Variant(VariantNode),
    Link(LinkNode),
    Test(TestNode),
}

impl Definition {
    /// Name of the definition, when it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Definition::Import(_) | Definition::Link(_) => None,
            Definition::Function(node) => Some(&node.name),
            Definition::Data(node) => Some(&node.name),
            Definition::Func(node) => Some(&node.name),
            Definition::Entity(node) => Some(&node.name),
            Definition::Enum(node) => Some(&node.name),
            Definition::Error(node) => Some(&node.name),
            Definition::Variant(node) => Some(&node.name),
            Definition::Test(node) => Some(&node.name),
        }
    }

    pub fn info(&self) -> &NodeInfo {
        match self {
            Definition::Import(node) => &node.info,
            Definition::Function(node) => &node.info,
            Definition::Data(node) => &node.info,
            Definition::Func(node) => &node.info,
            Definition::Entity(node) => &node.info,
            Definition::Enum(node) => &node.info,
            Definition::Error(node) => &node.info,
            Definition::Variant(node) => &node.info,
            Definition::Link(node) => &node.info,
            Definition::Test(node) => &node.info,
        }
    }
}
