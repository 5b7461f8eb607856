//! Class and interface nodes from parsed declarations.

use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use super::types::{ClassNode, MethodInfo, PropertyInfo};
use crate::error::{ErrorReport, FileError};
use crate::indexing::calculate_hash;
use crate::indexing::symbols::cache_key;
use crate::parsing::typescript::ParserSet;
use crate::parsing::{Declaration, Member, MethodDecl, PropertyDecl};
use crate::storage::{CacheEntry, PersistenceCache};

/// Result of extracting one file.
pub enum Extraction {
    Cached(Vec<ClassNode>),
    Parsed(Vec<ClassNode>),
    /// The file no longer exists
    Missing,
    Failed(ErrorReport),
}

/// Read, hash and parse `path`, reusing cached nodes for unchanged content.
pub fn extract_file(path: &Path, cache: &PersistenceCache, parsers: &mut ParserSet) -> Extraction {
    let code = match fs::read_to_string(path) {
        Ok(code) => code,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Extraction::Missing,
        Err(source) => {
            let err = FileError::Read {
                path: path.to_path_buf(),
                source,
            };
            return Extraction::Failed(ErrorReport::from_error(&err));
        }
    };
    let hash = calculate_hash(&code);
    let key = cache_key("classes", path);

    if cache.is_unchanged(path, &hash) {
        if let Some(entry) = cache.load::<CacheEntry<Vec<ClassNode>>>(&key) {
            if entry.is_fresh_for(&hash) {
                return Extraction::Cached(entry.value);
            }
        }
    }

    let declarations = match catch_unwind(AssertUnwindSafe(|| parsers.parse(path, &code))) {
        Ok(Ok(declarations)) => declarations,
        Ok(Err(source)) => {
            let err = FileError::Parse {
                path: path.to_path_buf(),
                source,
            };
            return Extraction::Failed(ErrorReport::from_error(&err));
        }
        Err(payload) => return Extraction::Failed(ErrorReport::from_panic(payload.as_ref())),
    };

    let nodes = class_nodes(path, declarations);
    cache.save(&key, &CacheEntry::for_file(key.as_str(), hash.as_str(), &nodes));
    cache.update_hash(path, &hash);
    Extraction::Parsed(nodes)
}

/// Keep classes and interfaces; everything else has no place in the hierarchy.
pub fn class_nodes(path: &Path, declarations: Vec<Declaration>) -> Vec<ClassNode> {
    declarations
        .into_iter()
        .filter_map(|decl| match decl {
            Declaration::Class(c) => {
                let (methods, properties) = split_members(c.members);
                Some(ClassNode {
                    name: c.name,
                    file_path: path.to_path_buf(),
                    line: c.position.line,
                    superclass: c.superclass,
                    interfaces: c.interfaces,
                    methods,
                    properties,
                    is_abstract: c.is_abstract,
                    is_interface: false,
                    type_parameters: c.type_parameters,
                })
            }
            Declaration::Interface(i) => {
                let (methods, properties) = split_members(i.members);
                Some(ClassNode {
                    name: i.name,
                    file_path: path.to_path_buf(),
                    line: i.position.line,
                    superclass: None,
                    interfaces: i.extends,
                    methods,
                    properties,
                    is_abstract: false,
                    is_interface: true,
                    type_parameters: i.type_parameters,
                })
            }
            Declaration::Function(_)
            | Declaration::Variable(_)
            | Declaration::Enum(_)
            | Declaration::TypeAlias(_)
            | Declaration::Namespace(_)
            | Declaration::Module(_) => None,
        })
        .collect()
}

fn split_members(members: Vec<Member>) -> (Vec<MethodInfo>, Vec<PropertyInfo>) {
    let mut methods = Vec::new();
    let mut properties = Vec::new();
    for member in members {
        match member {
            Member::Method(m) => methods.push(method_info(m)),
            Member::Property(p) => properties.push(property_info(p)),
        }
    }
    (methods, properties)
}

fn method_info(m: MethodDecl) -> MethodInfo {
    MethodInfo {
        name: m.name,
        return_type: m.return_type,
        parameters: m.parameters,
        access: m.access,
        is_static: m.is_static,
        is_abstract: m.is_abstract,
        has_override_modifier: m.has_override_modifier,
        is_override: false,
        overridden_from: None,
    }
}

fn property_info(p: PropertyDecl) -> PropertyInfo {
    PropertyInfo {
        name: p.name,
        type_text: p.type_text,
        access: p.access,
        is_static: p.is_static,
        is_readonly: p.is_readonly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::TypeScriptParser;

    #[test]
    fn test_nodes_from_source() {
        let code = r#"
export interface Shape extends Named { area(): number; }
export abstract class Base<T> implements Shape {
    protected static registry: Map<string, T>;
    abstract area(): number;
    override toString(): string { return ""; }
}
export function notAClass() {}
"#;
        let decls = TypeScriptParser::new(false).unwrap().parse(code).unwrap();
        let nodes = class_nodes(Path::new("/ws/shapes.ts"), decls);
        assert_eq!(nodes.len(), 2);

        let shape = &nodes[0];
        assert!(shape.is_interface);
        assert_eq!(shape.interfaces, vec!["Named"]);
        assert_eq!(shape.methods[0].name, "area");

        let base = &nodes[1];
        assert!(base.is_abstract);
        assert_eq!(base.interfaces, vec!["Shape"]);
        assert_eq!(base.type_parameters, vec!["T"]);
        assert_eq!(base.file_path, Path::new("/ws/shapes.ts"));
        assert!(base.properties[0].is_static);
        assert!(base.method("area").unwrap().is_abstract);
        let to_string = base.method("toString").unwrap();
        assert!(to_string.has_override_modifier);
        // Flagged only by recomputation against a registered superclass
        assert!(!to_string.is_override);
    }
}
