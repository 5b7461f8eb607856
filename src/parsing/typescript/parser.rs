//! TypeScript declaration extraction using tree-sitter.
//!
//! Walks only the top level of a file (plus class and interface bodies)
//! and turns each recognized declaration into a [`Declaration`]. Function
//! bodies are never descended into.

use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

use crate::error::{ParseError, ParseResult};
use crate::parsing::declaration::{
    Access, ClassDecl, Declaration, EnumDecl, FunctionDecl, InterfaceDecl, Member, MethodDecl,
    Parameter, Position, PropertyDecl, ScopeDecl, TypeAliasDecl, VariableDecl,
};
use crate::symbol::ExportStatus;

/// Extensions the TypeScript grammar handles.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

/// JSX-bearing files need the TSX grammar.
pub fn uses_tsx_grammar(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("tsx" | "jsx")
    )
}

/// Declaration-only files (`.d.ts` and friends).
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
        })
}

pub struct TypeScriptParser {
    parser: Parser,
    tsx: bool,
}

impl TypeScriptParser {
    pub fn new(tsx: bool) -> ParseResult<Self> {
        let (language, label): (Language, &'static str) = if tsx {
            (tree_sitter_typescript::LANGUAGE_TSX.into(), "tsx")
        } else {
            (tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), "typescript")
        };
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::Grammar {
                language: label,
                message: e.to_string(),
            })?;
        Ok(Self { parser, tsx })
    }

    /// Parser with the grammar matching `path`'s extension.
    pub fn for_path(path: &Path) -> ParseResult<Self> {
        Self::new(uses_tsx_grammar(path))
    }

    pub fn is_tsx(&self) -> bool {
        self.tsx
    }

    /// Extract the top-level declarations of `code`, in source order.
    pub fn parse(&mut self, code: &str) -> ParseResult<Vec<Declaration>> {
        let tree = self.parser.parse(code, None).ok_or(ParseError::NoTree)?;
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(target: "indexer", "syntax errors present, extracting what parsed");
        }

        let mut declarations = Vec::new();
        let mut exports = ExportList::default();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            collect(child, code, Context::default(), &mut declarations, &mut exports);
        }
        exports.apply(&mut declarations);
        Ok(declarations)
    }
}

/// Lazily created parsers, one per grammar. Meant to be owned by a single
/// worker thread.
#[derive(Default)]
pub struct ParserSet {
    typescript: Option<TypeScriptParser>,
    tsx: Option<TypeScriptParser>,
}

impl ParserSet {
    /// Parse `code` with the grammar matching `path`.
    pub fn parse(&mut self, path: &Path, code: &str) -> ParseResult<Vec<Declaration>> {
        let tsx = uses_tsx_grammar(path);
        let slot = if tsx { &mut self.tsx } else { &mut self.typescript };
        if slot.is_none() {
            *slot = Some(TypeScriptParser::new(tsx)?);
        }
        match slot {
            Some(parser) => parser.parse(code),
            None => Err(ParseError::NoTree),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    export: ExportStatus,
    ambient: bool,
}

/// Names exported separately from their declaration
/// (`export { a, b as c }`, `export default a;`).
#[derive(Default)]
struct ExportList {
    named: HashSet<String>,
    default: Option<String>,
}

impl ExportList {
    fn apply(&self, declarations: &mut [Declaration]) {
        for decl in declarations {
            let name = decl.name().to_string();
            let export = decl.export_mut();
            if self.default.as_deref() == Some(name.as_str()) {
                *export = ExportStatus::Default;
            } else if *export == ExportStatus::None && self.named.contains(&name) {
                *export = ExportStatus::Exported;
            }
        }
    }
}

fn collect(
    node: Node,
    code: &str,
    ctx: Context,
    out: &mut Vec<Declaration>,
    exports: &mut ExportList,
) {
    match node.kind() {
        "export_statement" => collect_export(node, code, ctx, out, exports),
        "ambient_declaration" => {
            let ctx = Context {
                ambient: true,
                ..ctx
            };
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect(child, code, ctx, out, exports);
            }
        }
        "expression_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "internal_module" {
                    collect(child, code, ctx, out, exports);
                }
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(decl) = class_decl(node, code, ctx) {
                out.push(Declaration::Class(decl));
            }
        }
        "interface_declaration" => {
            if let Some(decl) = interface_decl(node, code, ctx) {
                out.push(Declaration::Interface(decl));
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(decl) = function_decl(node, code, ctx) {
                out.push(Declaration::Function(decl));
            }
        }
        // Bodiless signatures are overloads unless they are ambient
        "function_signature" if ctx.ambient => {
            if let Some(decl) = function_decl(node, code, ctx) {
                out.push(Declaration::Function(decl));
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            out.extend(variable_decls(node, code, ctx).into_iter().map(Declaration::Variable));
        }
        "enum_declaration" => {
            if let Some(decl) = enum_decl(node, code, ctx) {
                out.push(Declaration::Enum(decl));
            }
        }
        "type_alias_declaration" => {
            if let Some(decl) = type_alias_decl(node, code, ctx) {
                out.push(Declaration::TypeAlias(decl));
            }
        }
        "internal_module" => {
            if let Some(decl) = scope_decl(node, code, ctx) {
                out.push(Declaration::Namespace(decl));
            }
        }
        "module" => {
            if let Some(decl) = scope_decl(node, code, ctx) {
                out.push(Declaration::Module(decl));
            }
        }
        _ => {}
    }
}

fn collect_export(
    node: Node,
    code: &str,
    ctx: Context,
    out: &mut Vec<Declaration>,
    exports: &mut ExportList,
) {
    let is_default = has_token(node, "default");
    let ctx = Context {
        export: ExportStatus::from_modifiers(true, is_default),
        ..ctx
    };
    // Re-exports from another module declare nothing here
    let reexport = node.child_by_field_name("source").is_some();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "export_clause" if !reexport => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() != "export_specifier" {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let name = text(name, code);
                    let alias = spec.child_by_field_name("alias").map(|a| text(a, code));
                    if alias.as_deref() == Some("default") {
                        exports.default = Some(name);
                    } else {
                        exports.named.insert(name);
                    }
                }
            }
            "identifier" if is_default => exports.default = Some(text(child, code)),
            "decorator" | "comment" => {}
            _ => collect(child, code, ctx, out, exports),
        }
    }
}

fn class_decl(node: Node, code: &str, ctx: Context) -> Option<ClassDecl> {
    let name = text(node.child_by_field_name("name")?, code);
    let (superclass, interfaces) = class_heritage(node, code);
    Some(ClassDecl {
        name,
        position: position(node),
        doc: doc_comment(node, code),
        export: ctx.export,
        superclass,
        interfaces,
        is_abstract: node.kind() == "abstract_class_declaration",
        type_parameters: type_parameters(node, code),
        members: node
            .child_by_field_name("body")
            .map(|body| members(body, code))
            .unwrap_or_default(),
    })
}

/// Superclass name and implemented interface names.
fn class_heritage(node: Node, code: &str) -> (Option<String>, Vec<String>) {
    let mut superclass = None;
    let mut interfaces = Vec::new();

    let mut cursor = node.walk();
    let Some(heritage) = node
        .children(&mut cursor)
        .find(|child| child.kind() == "class_heritage")
    else {
        return (superclass, interfaces);
    };

    let mut cursor = heritage.walk();
    for clause in heritage.named_children(&mut cursor) {
        match clause.kind() {
            "extends_clause" => {
                let mut inner = clause.walk();
                let value = clause
                    .child_by_field_name("value")
                    .or_else(|| clause.named_children(&mut inner).next());
                superclass = value.map(|v| text(v, code));
            }
            "implements_clause" => {
                let mut inner = clause.walk();
                interfaces.extend(clause.named_children(&mut inner).map(|t| type_name(t, code)));
            }
            _ => {}
        }
    }
    (superclass, interfaces)
}

fn interface_decl(node: Node, code: &str, ctx: Context) -> Option<InterfaceDecl> {
    let name = text(node.child_by_field_name("name")?, code);

    let mut extends = Vec::new();
    let mut cursor = node.walk();
    if let Some(clause) = node
        .children(&mut cursor)
        .find(|child| child.kind() == "extends_type_clause")
    {
        let mut inner = clause.walk();
        extends.extend(clause.named_children(&mut inner).map(|t| type_name(t, code)));
    }

    Some(InterfaceDecl {
        name,
        position: position(node),
        doc: doc_comment(node, code),
        export: ctx.export,
        extends,
        type_parameters: type_parameters(node, code),
        members: node
            .child_by_field_name("body")
            .map(|body| members(body, code))
            .unwrap_or_default(),
    })
}

/// Methods and properties of a class or interface body.
///
/// Overload signatures and accessor pairs collapse into the first
/// declaration of that name.
fn members(body: Node, code: &str) -> Vec<Member> {
    let mut seen: HashSet<(String, bool)> = HashSet::new();
    let mut out = Vec::new();

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        let member = match child.kind() {
            "method_definition" | "abstract_method_signature" | "method_signature" => {
                method_decl(child, code).map(Member::Method)
            }
            "public_field_definition" | "field_definition" | "property_signature" => {
                property_decl(child, code).map(Member::Property)
            }
            _ => None,
        };
        let Some(member) = member else {
            continue;
        };
        let is_static = match &member {
            Member::Method(m) => m.is_static,
            Member::Property(p) => p.is_static,
        };
        if seen.insert((member.name().to_string(), is_static)) {
            out.push(member);
        }
    }
    out
}

fn method_decl(node: Node, code: &str) -> Option<MethodDecl> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, code);
    let modifiers = Modifiers::scan(node, name_node, code);
    Some(MethodDecl {
        access: modifiers.access_for(&name),
        position: position(node),
        doc: doc_comment(node, code),
        is_static: modifiers.is_static,
        is_abstract: modifiers.is_abstract || node.kind() == "abstract_method_signature",
        has_override_modifier: modifiers.is_override,
        is_async: modifiers.is_async,
        parameters: node
            .child_by_field_name("parameters")
            .map(|p| parameters(p, code))
            .unwrap_or_default(),
        return_type: node
            .child_by_field_name("return_type")
            .map(|t| annotation_text(t, code)),
        name,
    })
}

fn property_decl(node: Node, code: &str) -> Option<PropertyDecl> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, code);
    let modifiers = Modifiers::scan(node, name_node, code);
    Some(PropertyDecl {
        access: modifiers.access_for(&name),
        position: position(node),
        doc: doc_comment(node, code),
        is_static: modifiers.is_static,
        is_readonly: modifiers.is_readonly,
        optional: modifiers.optional,
        type_text: node
            .child_by_field_name("type")
            .map(|t| annotation_text(t, code)),
        name,
    })
}

#[derive(Debug, Default)]
struct Modifiers {
    access: Option<Access>,
    is_static: bool,
    is_abstract: bool,
    is_readonly: bool,
    is_override: bool,
    is_async: bool,
    optional: bool,
}

impl Modifiers {
    /// Keywords before the name are modifiers; a `?` after it marks optional.
    fn scan(node: Node, name: Node, code: &str) -> Self {
        let mut modifiers = Self::default();
        let mut after_name = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.id() == name.id() {
                after_name = true;
                continue;
            }
            if after_name {
                if child.kind() == "?" {
                    modifiers.optional = true;
                }
                continue;
            }
            match child.kind() {
                "accessibility_modifier" => modifiers.access = Some(Access::parse(&text(child, code))),
                "static" => modifiers.is_static = true,
                "abstract" => modifiers.is_abstract = true,
                "readonly" => modifiers.is_readonly = true,
                "override_modifier" => modifiers.is_override = true,
                "async" => modifiers.is_async = true,
                _ => {}
            }
        }
        modifiers
    }

    /// `#name` members are private regardless of keywords.
    fn access_for(&self, name: &str) -> Access {
        if name.starts_with('#') {
            Access::Private
        } else {
            self.access.unwrap_or_default()
        }
    }
}

fn function_decl(node: Node, code: &str, ctx: Context) -> Option<FunctionDecl> {
    let name = text(node.child_by_field_name("name")?, code);
    Some(FunctionDecl {
        name,
        position: position(node),
        doc: doc_comment(node, code),
        export: ctx.export,
        is_async: has_token(node, "async"),
        is_generator: node.kind() == "generator_function_declaration" || has_token(node, "*"),
        parameters: node
            .child_by_field_name("parameters")
            .map(|p| parameters(p, code))
            .unwrap_or_default(),
        return_type: node
            .child_by_field_name("return_type")
            .map(|t| annotation_text(t, code)),
    })
}

/// One declaration per binding; all share the statement's doc and export.
fn variable_decls(node: Node, code: &str, ctx: Context) -> Vec<VariableDecl> {
    let doc = doc_comment(node, code);
    let is_const = node
        .child_by_field_name("kind")
        .is_some_and(|kind| kind.kind() == "const")
        || has_token(node, "const");

    let mut out = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        let type_text = declarator
            .child_by_field_name("type")
            .map(|t| annotation_text(t, code));
        let is_function_value = declarator.child_by_field_name("value").is_some_and(|v| {
            matches!(v.kind(), "arrow_function" | "function_expression" | "function")
        });

        let mut bindings = Vec::new();
        binding_names(name_node, &mut bindings);
        for binding in bindings {
            out.push(VariableDecl {
                name: text(binding, code),
                position: position(binding),
                doc: doc.clone(),
                export: ctx.export,
                is_const,
                type_text: type_text.clone(),
                is_function_value,
            });
        }
    }
    out
}

/// Identifiers bound by a declarator name, including destructuring patterns.
fn binding_names<'a>(pattern: Node<'a>, out: &mut Vec<Node<'a>>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(pattern),
        // Only the left side binds; the right is a default value
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                binding_names(left, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                binding_names(value, out);
            }
        }
        _ => {
            let mut cursor = pattern.walk();
            for child in pattern.named_children(&mut cursor) {
                binding_names(child, out);
            }
        }
    }
}

fn enum_decl(node: Node, code: &str, ctx: Context) -> Option<EnumDecl> {
    let name = text(node.child_by_field_name("name")?, code);
    let mut members = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "enum_assignment" => {
                    if let Some(member) = child.child_by_field_name("name") {
                        members.push(unquote(&text(member, code)));
                    }
                }
                "comment" => {}
                _ => members.push(unquote(&text(child, code))),
            }
        }
    }
    Some(EnumDecl {
        name,
        position: position(node),
        doc: doc_comment(node, code),
        export: ctx.export,
        is_const: has_token(node, "const"),
        members,
    })
}

fn type_alias_decl(node: Node, code: &str, ctx: Context) -> Option<TypeAliasDecl> {
    let name = text(node.child_by_field_name("name")?, code);
    Some(TypeAliasDecl {
        name,
        position: position(node),
        doc: doc_comment(node, code),
        export: ctx.export,
        type_parameters: type_parameters(node, code),
        value: node.child_by_field_name("value").map(|v| text(v, code)),
    })
}

fn scope_decl(node: Node, code: &str, ctx: Context) -> Option<ScopeDecl> {
    let name = unquote(&text(node.child_by_field_name("name")?, code));
    Some(ScopeDecl {
        name,
        position: position(node),
        doc: doc_comment(node, code),
        export: ctx.export,
    })
}

fn parameters(node: Node, code: &str) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for param in node.named_children(&mut cursor) {
        match param.kind() {
            "required_parameter" | "optional_parameter" => {
                let Some(pattern) = param.child_by_field_name("pattern") else {
                    continue;
                };
                out.push(Parameter {
                    name: text(pattern, code),
                    type_text: param
                        .child_by_field_name("type")
                        .map(|t| annotation_text(t, code)),
                    optional: param.kind() == "optional_parameter",
                });
            }
            "identifier" => out.push(Parameter {
                name: text(param, code),
                type_text: None,
                optional: false,
            }),
            _ => {}
        }
    }
    out
}

fn type_parameters(node: Node, code: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("type_parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|p| p.kind() == "type_parameter")
        .map(|p| {
            p.child_by_field_name("name")
                .map(|n| text(n, code))
                .unwrap_or_else(|| text(p, code))
        })
        .collect()
}

/// Bare name of a type reference: `Repo<T>` becomes `Repo`.
fn type_name(node: Node, code: &str) -> String {
    match node.kind() {
        "generic_type" => node
            .child_by_field_name("name")
            .map(|n| text(n, code))
            .unwrap_or_else(|| text(node, code)),
        _ => text(node, code),
    }
}

/// Type text without the leading `:`.
fn annotation_text(node: Node, code: &str) -> String {
    let raw = &code[node.byte_range()];
    raw.trim().trim_start_matches(':').trim().to_string()
}

/// Nearest preceding `/** */` comment, with markers stripped.
///
/// Export, ambient and expression wrappers are looked through, and
/// decorators between the comment and the declaration are skipped.
fn doc_comment(node: Node, code: &str) -> String {
    let mut anchor = node;
    while let Some(parent) = anchor.parent() {
        match parent.kind() {
            "export_statement" | "ambient_declaration" | "expression_statement" => anchor = parent,
            _ => break,
        }
    }

    let mut prev = anchor.prev_sibling();
    while let Some(sibling) = prev {
        if sibling.kind() == "decorator" {
            prev = sibling.prev_sibling();
        } else {
            break;
        }
    }

    match prev {
        Some(comment) if comment.kind() == "comment" => {
            let raw = &code[comment.byte_range()];
            if raw.starts_with("/**") && raw != "/**/" {
                clean_doc(raw)
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

fn clean_doc(raw: &str) -> String {
    raw.trim_start_matches("/**")
        .trim_end_matches("*/")
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token)
}

fn position(node: Node) -> Position {
    let start = node.start_position();
    Position {
        line: start.row as u32 + 1,
        column: start.column as u32 + 1,
    }
}

fn text(node: Node, code: &str) -> String {
    code[node.byte_range()].to_string()
}

fn unquote(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}
