// Syntax tree for Go source files
// Only the structure the init tracer needs is modelled: top-level
// declarations, function headers and the statement list of function bodies.
// Everything else is kept as verbatim source fragments.

pub mod source_gen;
pub use source_gen::{quote_go_string, render, ToSource};


use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How a node was separated from the node before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spacing {
    /// Same line, e.g. a trailing `// comment`
    SameLine,
    /// Next line
    Newline,
    /// At least one empty line in between
    BlankLine,
}

/// A node together with its separation from the previous sibling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spaced<T> {
    pub spacing: Spacing,
    pub node: T,
}

impl<T> Spaced<T> {
    pub fn new(spacing: Spacing, node: T) -> Self {
        Self { spacing, node }
    }

    /// Node on its own line
    pub fn line(node: T) -> Self {
        Self::new(Spacing::Newline, node)
    }

    /// Node preceded by an empty line
    pub fn blank(node: T) -> Self {
        Self::new(Spacing::BlankLine, node)
    }
}

/// One parsed Go file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub decls: Vec<Spaced<Decl>>,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    /// `package name`
    Package(String),
    /// `import ...`, single or grouped
    Import(ImportDecl),
    /// Function or method declaration
    Func(FuncDecl),
    /// Line or block comment
    Comment(String),
    /// type/var/const declaration
    Named(NamedDecl),
    /// Anything else, passed through as is
    Opaque(String),
}

/// A declaration kept verbatim, together with the identifiers it binds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedDecl {
    pub text: String,
    /// Declared names, blank identifiers excluded
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Source text of the whole declaration
    pub text: String,
    pub specs: Vec<ImportSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Explicit package name: an alias, `_` or `.`
    pub name: Option<String>,
    /// Unquoted import path
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    /// Receiver parameter list including parentheses, for methods
    pub receiver: Option<String>,
    pub name: String,
    /// `[T any]` for generic functions
    pub type_params: Option<String>,
    /// Parameter list including parentheses
    pub params: String,
    pub result: Option<String>,
    /// Comments inside the signature, emitted between it and the body
    #[serde(default)]
    pub comments: Vec<String>,
    /// `None` for declarations without a body (assembly stubs)
    pub body: Option<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spaced<Stmt>>,
}

/// Statements inside a function body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// An existing statement, never inspected
    Opaque(String),
    Comment(String),
    /// A call with string literal arguments, the only statement we build
    Call(CallStmt),
}

/// `qualifier.function("arg", ...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStmt {
    pub qualifier: Option<String>,
    pub function: String,
    /// Literal values, unquoted
    pub args: Vec<String>,
}

impl SourceFile {
    pub fn new(package: &str) -> Self {
        Self {
            decls: vec![Spaced::line(Decl::Package(package.to_string()))],
        }
    }

    /// Package name from the package clause
    pub fn package(&self) -> Option<&str> {
        self.decls.iter().find_map(|d| match &d.node {
            Decl::Package(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Append a declaration after everything else, separated by a blank line
    pub fn push_decl(&mut self, decl: Decl) {
        self.decls.push(Spaced::blank(decl));
    }

    /// Function declaration at `index`, if that declaration is one
    pub fn func(&self, index: usize) -> Option<&FuncDecl> {
        match self.decls.get(index).map(|d| &d.node) {
            Some(Decl::Func(func)) => Some(func),
            _ => None,
        }
    }

    pub fn func_mut(&mut self, index: usize) -> Option<&mut FuncDecl> {
        match self.decls.get_mut(index).map(|d| &mut d.node) {
            Some(Decl::Func(func)) => Some(func),
            _ => None,
        }
    }

    /// All function and method declarations in source order
    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|d| match &d.node {
            Decl::Func(func) => Some(func),
            _ => None,
        })
    }

    /// Names of package-level functions (methods excluded)
    pub fn function_names(&self) -> Vec<&str> {
        self.funcs()
            .filter(|f| f.receiver.is_none())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Name under which the package at `path` is usable in this file
    ///
    /// Blank and dot imports do not make the package addressable by name.
    pub fn import_name(&self, path: &str) -> Option<String> {
        self.imports()
            .filter(|spec| spec.path == path)
            .find_map(|spec| match spec.name.as_deref() {
                None => Some(default_package_name(path).to_string()),
                Some("_") | Some(".") => None,
                Some(alias) => Some(alias.to_string()),
            })
    }

    /// Every identifier bound at file scope: import names, package-level
    /// functions and type/var/const names
    pub fn bound_names(&self) -> HashSet<&str> {
        let imports = self.imports().filter_map(|spec| match spec.name.as_deref() {
            None => Some(default_package_name(&spec.path)),
            Some("_") | Some(".") => None,
            Some(alias) => Some(alias),
        });
        let named = self.decls.iter().filter_map(|d| match &d.node {
            Decl::Named(named) => Some(named.names.iter().map(String::as_str)),
            _ => None,
        });
        imports
            .chain(self.function_names())
            .chain(named.flatten())
            .collect()
    }

    /// Make sure the package at `path` is imported, returning its local name
    ///
    /// A new `import` declaration goes after the last existing import, or
    /// after the package clause when the file has none. When the default
    /// name is already bound in the file the package is imported under
    /// `<name>_<n>` instead.
    pub fn ensure_import(&mut self, path: &str) -> String {
        if let Some(name) = self.import_name(path) {
            return name;
        }

        let default_name = default_package_name(path);
        let (name, import) = {
            let bound = self.bound_names();
            if bound.contains(default_name) {
                let mut n = 1;
                let alias = loop {
                    let candidate = format!("{default_name}_{n}");
                    if !bound.contains(candidate.as_str()) {
                        break candidate;
                    }
                    n += 1;
                };
                let import = ImportDecl::aliased(&alias, path);
                (alias, import)
            } else {
                (default_name.to_string(), ImportDecl::single(path))
            }
        };

        let mut index = self
            .decls
            .iter()
            .rposition(|d| matches!(d.node, Decl::Import(_) | Decl::Package(_)))
            .map(|i| i + 1)
            .unwrap_or(0);
        // keep trailing same-line comments attached to their declaration
        while self
            .decls
            .get(index)
            .is_some_and(|d| d.spacing == Spacing::SameLine)
        {
            index += 1;
        }

        self.decls.insert(index, Spaced::blank(Decl::Import(import)));
        name
    }

    fn imports(&self) -> impl Iterator<Item = &ImportSpec> {
        self.decls
            .iter()
            .filter_map(|d| match &d.node {
                Decl::Import(import) => Some(import.specs.iter()),
                _ => None,
            })
            .flatten()
    }
}

impl ImportDecl {
    /// `import "path"`
    pub fn single(path: &str) -> Self {
        Self {
            text: format!("import {}", quote_go_string(path)),
            specs: vec![ImportSpec {
                name: None,
                path: path.to_string(),
            }],
        }
    }

    /// `import name "path"`
    pub fn aliased(name: &str, path: &str) -> Self {
        Self {
            text: format!("import {name} {}", quote_go_string(path)),
            specs: vec![ImportSpec {
                name: Some(name.to_string()),
                path: path.to_string(),
            }],
        }
    }
}

impl FuncDecl {
    /// True when the parameter list is `()`
    pub fn takes_no_params(&self) -> bool {
        self.params.chars().filter(|c| !c.is_whitespace()).eq("()".chars())
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    /// Deep copy under a different name
    pub fn clone_renamed(&self, name: &str) -> FuncDecl {
        FuncDecl {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

impl Block {
    pub fn new(stmts: Vec<Spaced<Stmt>>) -> Self {
        Self { stmts }
    }

    /// Put a statement in front of all existing ones
    pub fn prepend(&mut self, stmt: Stmt) {
        self.stmts.insert(0, Spaced::line(stmt));
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// First statement that is not a comment
    pub fn first_stmt(&self) -> Option<&Stmt> {
        self.stmts
            .iter()
            .map(|s| &s.node)
            .find(|s| !matches!(s, Stmt::Comment(_)))
    }
}

/// Default package name for an import path: its last element
pub fn default_package_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

/// Whether `name` is a valid Go identifier and not a keyword
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && !GO_KEYWORDS.contains(&name)
}
