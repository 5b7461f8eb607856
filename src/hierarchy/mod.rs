//! Class and interface hierarchy of a TypeScript workspace.

pub mod builder;
pub mod extract;
pub mod types;

pub use builder::{BuildStats, ClassHierarchyBuilder, HIERARCHY_KEY};
pub use extract::class_nodes;
pub use types::{
    ClassHierarchy, ClassNode, InheritanceChain, MethodInfo, MethodOverride, PropertyInfo,
};
