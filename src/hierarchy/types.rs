//! Class hierarchy data model.
//!
//! [`ClassHierarchy`] owns the class and interface node maps. The
//! inheritance and implementation trees are derived from those maps and
//! only ever rebuilt as a whole by [`ClassHierarchy::recompute`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::parsing::{Access, Parameter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
    pub access: Access,
    pub is_static: bool,
    pub is_abstract: bool,
    /// `override` keyword present in source. Informational only.
    pub has_override_modifier: bool,
    /// Same name as a method of the registered immediate superclass
    pub is_override: bool,
    pub overridden_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub type_text: Option<String>,
    pub access: Access,
    pub is_static: bool,
    pub is_readonly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub file_path: PathBuf,
    pub line: u32,
    pub superclass: Option<String>,
    /// Implemented interfaces, or extended ones for an interface node
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodInfo>,
    pub properties: Vec<PropertyInfo>,
    pub is_abstract: bool,
    pub is_interface: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
}

impl ClassNode {
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceChain {
    /// Ancestors, nearest first
    pub chain: Vec<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodOverride {
    pub class_name: String,
    pub method_name: String,
    pub overridden_from: Option<String>,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHierarchy {
    pub classes: HashMap<String, ClassNode>,
    pub interfaces: HashMap<String, ClassNode>,
    /// Superclass name to direct subclass names
    pub inheritance_tree: BTreeMap<String, Vec<String>>,
    /// Interface name to implementing class names
    pub implementation_tree: BTreeMap<String, Vec<String>>,
}

impl ClassHierarchy {
    /// Register a node under its own name; the last writer wins.
    pub fn insert(&mut self, node: ClassNode) {
        let map = if node.is_interface {
            &mut self.interfaces
        } else {
            &mut self.classes
        };
        if let Some(previous) = map.insert(node.name.clone(), node) {
            tracing::debug!(
                target: "hierarchy",
                "'{}' from {} replaced",
                previous.name,
                previous.file_path.display()
            );
        }
    }

    /// Drop every node declared in `path`. Returns how many were removed.
    pub fn remove_file(&mut self, path: &Path) -> usize {
        let before = self.classes.len() + self.interfaces.len();
        self.classes.retain(|_, node| node.file_path != path);
        self.interfaces.retain(|_, node| node.file_path != path);
        before - self.classes.len() - self.interfaces.len()
    }

    /// Rebuild both derived trees and the override flags from the node maps.
    pub fn recompute(&mut self) {
        self.inheritance_tree.clear();
        self.implementation_tree.clear();

        let mut names: Vec<&String> = self.classes.keys().collect();
        names.sort();
        for name in names {
            let node = &self.classes[name];
            if let Some(superclass) = &node.superclass {
                self.inheritance_tree
                    .entry(superclass.clone())
                    .or_default()
                    .push(name.clone());
            }
            for interface in &node.interfaces {
                self.implementation_tree
                    .entry(interface.clone())
                    .or_default()
                    .push(name.clone());
            }
        }

        // Immediate superclass only
        let inherited: Vec<(String, String, HashSet<String>)> = self
            .classes
            .values()
            .filter_map(|node| {
                let superclass = node.superclass.as_ref()?;
                let parent = self.classes.get(superclass)?;
                let methods = parent.methods.iter().map(|m| m.name.clone()).collect();
                Some((node.name.clone(), superclass.clone(), methods))
            })
            .collect();

        for node in self.classes.values_mut() {
            for method in &mut node.methods {
                method.is_override = false;
                method.overridden_from = None;
            }
        }
        for (class_name, superclass, methods) in inherited {
            let Some(node) = self.classes.get_mut(&class_name) else {
                continue;
            };
            for method in &mut node.methods {
                if methods.contains(&method.name) {
                    method.is_override = true;
                    method.overridden_from = Some(superclass.clone());
                }
            }
        }
    }

    /// Class first, then interface.
    pub fn get(&self, name: &str) -> Option<&ClassNode> {
        self.classes.get(name).or_else(|| self.interfaces.get(name))
    }

    /// Ancestors of `name`, nearest first.
    ///
    /// Stops after the first superclass that is not itself registered.
    /// `max_hops` bounds the walk so a cycle ends with a warning and a
    /// partial chain.
    pub fn inheritance_chain(&self, name: &str, max_hops: usize) -> InheritanceChain {
        let mut chain = Vec::new();
        let Some(mut node) = self.get(name) else {
            return InheritanceChain::default();
        };

        while let Some(superclass) = node.superclass.as_deref() {
            if chain.len() >= max_hops {
                tracing::warn!(
                    target: "hierarchy",
                    "inheritance chain of '{name}' reached {max_hops} hops, possible cycle"
                );
                break;
            }
            chain.push(superclass.to_string());
            match self.classes.get(superclass) {
                Some(parent) => node = parent,
                None => break,
            }
        }

        InheritanceChain {
            depth: chain.len(),
            chain,
        }
    }

    /// Whether `class_name` or any ancestor declares `interface_name`.
    pub fn implements(&self, class_name: &str, interface_name: &str, max_hops: usize) -> bool {
        let Some(node) = self.classes.get(class_name) else {
            return false;
        };
        if node.interfaces.iter().any(|i| i == interface_name) {
            return true;
        }
        self.inheritance_chain(class_name, max_hops)
            .chain
            .iter()
            .filter_map(|ancestor| self.classes.get(ancestor))
            .any(|ancestor| ancestor.interfaces.iter().any(|i| i == interface_name))
    }

    /// Classes that list `interface_name` directly.
    pub fn implementations_of(&self, interface_name: &str) -> Vec<&ClassNode> {
        self.implementation_tree
            .get(interface_name)
            .into_iter()
            .flatten()
            .filter_map(|name| self.classes.get(name))
            .collect()
    }

    /// Every transitive subclass of `name`, breadth first.
    pub fn derived_classes_of(&self, name: &str) -> Vec<&ClassNode> {
        let mut visited: HashSet<&str> = HashSet::from([name]);
        let mut queue: VecDeque<&str> = VecDeque::from([name]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(children) = self.inheritance_tree.get(current) else {
                continue;
            };
            for child in children {
                if !visited.insert(child.as_str()) {
                    continue;
                }
                if let Some(node) = self.classes.get(child) {
                    out.push(node);
                }
                queue.push_back(child.as_str());
            }
        }
        out
    }

    /// Override records for `method_name` on `class_name` and its descendants.
    pub fn overrides_of(&self, class_name: &str, method_name: &str) -> Vec<MethodOverride> {
        let own = self.classes.get(class_name).into_iter();
        own.chain(self.derived_classes_of(class_name))
            .filter_map(|node| {
                let method = node.method(method_name)?;
                method.is_override.then(|| MethodOverride {
                    class_name: node.name.clone(),
                    method_name: method.name.clone(),
                    overridden_from: method.overridden_from.clone(),
                    file_path: node.file_path.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str) -> MethodInfo {
        MethodInfo {
            name: name.to_string(),
            return_type: None,
            parameters: Vec::new(),
            access: Access::Public,
            is_static: false,
            is_abstract: false,
            has_override_modifier: false,
            is_override: false,
            overridden_from: None,
        }
    }

    fn class(name: &str, superclass: Option<&str>, interfaces: &[&str], methods: &[&str]) -> ClassNode {
        ClassNode {
            name: name.to_string(),
            file_path: PathBuf::from(format!("{}.ts", name.to_lowercase())),
            line: 1,
            superclass: superclass.map(str::to_string),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            methods: methods.iter().map(|m| method(m)).collect(),
            properties: Vec::new(),
            is_abstract: false,
            is_interface: false,
            type_parameters: Vec::new(),
        }
    }

    fn hierarchy(nodes: Vec<ClassNode>) -> ClassHierarchy {
        let mut h = ClassHierarchy::default();
        for node in nodes {
            h.insert(node);
        }
        h.recompute();
        h
    }

    #[test]
    fn test_chain_and_depth() {
        let h = hierarchy(vec![
            class("A", None, &[], &[]),
            class("B", Some("A"), &[], &[]),
            class("C", Some("B"), &[], &[]),
        ]);
        let chain = h.inheritance_chain("C", 50);
        assert_eq!(chain.chain, vec!["B", "A"]);
        assert_eq!(chain.depth, 2);
        assert_eq!(h.inheritance_chain("A", 50), InheritanceChain::default());
        assert_eq!(h.inheritance_chain("Nope", 50), InheritanceChain::default());
    }

    #[test]
    fn test_chain_includes_unregistered_superclass() {
        let h = hierarchy(vec![class("Widget", Some("External"), &[], &[])]);
        assert_eq!(h.inheritance_chain("Widget", 50).chain, vec!["External"]);
    }

    #[test]
    fn test_cycle_is_capped() {
        let h = hierarchy(vec![
            class("X", Some("Y"), &[], &[]),
            class("Y", Some("X"), &[], &[]),
        ]);
        let chain = h.inheritance_chain("X", 50);
        assert_eq!(chain.depth, 50);
        assert_eq!(chain.chain[0], "Y");
        assert_eq!(chain.chain[1], "X");
        // Descendant walk terminates too, never yielding the start class
        let derived: Vec<_> = h.derived_classes_of("X").iter().map(|n| n.name.as_str()).collect();
        assert_eq!(derived, vec!["Y"]);
    }

    #[test]
    fn test_override_marking_is_immediate_only() {
        let h = hierarchy(vec![
            class("Base", None, &[], &["m", "n"]),
            class("Mid", Some("Base"), &[], &["m"]),
            class("Leaf", Some("Mid"), &[], &["m", "n"]),
        ]);
        let leaf = h.get("Leaf").unwrap();
        let m = leaf.method("m").unwrap();
        assert!(m.is_override);
        assert_eq!(m.overridden_from.as_deref(), Some("Mid"));
        // `n` lives on Base, two levels up
        assert!(!leaf.method("n").unwrap().is_override);

        let records = h.overrides_of("Base", "m");
        let names: Vec<_> = records.iter().map(|r| r.class_name.as_str()).collect();
        assert_eq!(names, vec!["Mid", "Leaf"]);
    }

    #[test]
    fn test_recompute_resets_stale_flags() {
        let mut h = hierarchy(vec![
            class("Base", None, &[], &["m"]),
            class("Derived", Some("Base"), &[], &["m"]),
        ]);
        assert!(h.get("Derived").unwrap().method("m").unwrap().is_override);

        h.remove_file(Path::new("base.ts"));
        h.recompute();
        let m = h.get("Derived").unwrap().method("m").unwrap();
        assert!(!m.is_override);
        assert_eq!(m.overridden_from, None);
    }

    #[test]
    fn test_override_keyword_alone_is_not_an_override() {
        let mut widget = class("Widget", Some("External"), &[], &["render"]);
        widget.methods[0].has_override_modifier = true;
        let h = hierarchy(vec![widget]);

        let render = h.get("Widget").unwrap().method("render").unwrap();
        assert!(render.has_override_modifier);
        assert!(!render.is_override);
        assert!(h.overrides_of("Widget", "render").is_empty());
    }

    #[test]
    fn test_implements_through_ancestors() {
        let h = hierarchy(vec![
            class("Parent", None, &["I"], &[]),
            class("Child", Some("Parent"), &[], &[]),
        ]);
        assert!(h.implements("Child", "I", 50));
        assert!(!h.implements("Child", "J", 50));
        let implementors: Vec<_> = h.implementations_of("I").iter().map(|n| n.name.as_str()).collect();
        assert_eq!(implementors, vec!["Parent"]);
    }

    #[test]
    fn test_interfaces_live_in_their_own_map() {
        let mut iface = class("Shape", None, &[], &["area"]);
        iface.is_interface = true;
        let h = hierarchy(vec![iface, class("Circle", None, &["Shape"], &["area"])]);
        assert!(h.classes.get("Shape").is_none());
        assert!(h.get("Shape").unwrap().is_interface);
        assert_eq!(h.implementation_tree["Shape"], vec!["Circle"]);
    }
}
