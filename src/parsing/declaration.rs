//! Declarations extracted from a syntax tree.
//!
//! A closed set of variants, one per declaration kind the indexers care
//! about. Each carries only what is needed to build a `Symbol` or a
//! `ClassNode`; consumers match on it exhaustively.

use serde::{Deserialize, Serialize};

use crate::symbol::ExportStatus;

/// 1-indexed line and column of a declaration's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

impl Access {
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "private" => Access::Private,
            "protected" => Access::Protected,
            _ => Access::Public,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub access: Access,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Explicit `override` keyword in source
    pub has_override_modifier: bool,
    pub is_async: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub access: Access,
    pub is_static: bool,
    pub is_readonly: bool,
    pub optional: bool,
    pub type_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Member {
    Method(MethodDecl),
    Property(PropertyDecl),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Method(m) => &m.name,
            Member::Property(p) => &p.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub type_parameters: Vec<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
    pub extends: Vec<String>,
    pub type_parameters: Vec<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
    pub is_async: bool,
    pub is_generator: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

/// One binding of a `const`/`let`/`var` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
    pub is_const: bool,
    pub type_text: Option<String>,
    /// Initialized with an arrow function or function expression
    pub is_function_value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
    pub is_const: bool,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
    pub type_parameters: Vec<String>,
    pub value: Option<String>,
}

/// `namespace X {}` and `module "x" {}` share a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDecl {
    pub name: String,
    pub position: Position,
    pub doc: String,
    pub export: ExportStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Declaration {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Namespace(ScopeDecl),
    Module(ScopeDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(d) => &d.name,
            Declaration::Interface(d) => &d.name,
            Declaration::Function(d) => &d.name,
            Declaration::Variable(d) => &d.name,
            Declaration::Enum(d) => &d.name,
            Declaration::TypeAlias(d) => &d.name,
            Declaration::Namespace(d) | Declaration::Module(d) => &d.name,
        }
    }

    pub fn export(&self) -> ExportStatus {
        match self {
            Declaration::Class(d) => d.export,
            Declaration::Interface(d) => d.export,
            Declaration::Function(d) => d.export,
            Declaration::Variable(d) => d.export,
            Declaration::Enum(d) => d.export,
            Declaration::TypeAlias(d) => d.export,
            Declaration::Namespace(d) | Declaration::Module(d) => d.export,
        }
    }

    pub(crate) fn export_mut(&mut self) -> &mut ExportStatus {
        match self {
            Declaration::Class(d) => &mut d.export,
            Declaration::Interface(d) => &mut d.export,
            Declaration::Function(d) => &mut d.export,
            Declaration::Variable(d) => &mut d.export,
            Declaration::Enum(d) => &mut d.export,
            Declaration::TypeAlias(d) => &mut d.export,
            Declaration::Namespace(d) | Declaration::Module(d) => &mut d.export,
        }
    }
}
