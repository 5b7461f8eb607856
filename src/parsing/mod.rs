//! Source parsing into declaration values.

pub mod declaration;
pub mod typescript;

pub use declaration::{
    Access, ClassDecl, Declaration, EnumDecl, FunctionDecl, InterfaceDecl, Member, MethodDecl,
    Parameter, Position, PropertyDecl, ScopeDecl, TypeAliasDecl, VariableDecl,
};
pub use typescript::TypeScriptParser;
