use tree_sitter::Node;

use crate::ast::{Block, Decl, FuncDecl, ImportDecl, ImportSpec, NamedDecl, SourceFile, Spaced, Spacing, Stmt};
use crate::parser::Parser;
use crate::{Result, TracerError};

/// Go parser using tree-sitter-go
///
/// Top-level declarations are converted into `Decl` nodes. Functions are
/// split into header pieces and a body whose statements are kept verbatim.
pub struct GoParser {
    parser: tree_sitter::Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| TracerError::Config(format!("Failed to set Go language: {e}")))?;

        Ok(Self { parser })
    }

    fn convert_source_file(&self, root: Node, source: &str) -> Result<SourceFile> {
        let mut decls: Vec<Spaced<Decl>> = Vec::new();
        let mut prev_end_row = None;

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let decl = self.convert_decl(child, source)?;

            match &decl {
                Decl::Package(_) if decls.iter().any(|d| !matches!(d.node, Decl::Comment(_))) => {
                    return Err(error_at(child, "package clause must come first"));
                }
                Decl::Comment(_) | Decl::Package(_) => {}
                _ if decls.iter().all(|d| !matches!(d.node, Decl::Package(_))) => {
                    return Err(error_at(child, "expected package clause"));
                }
                _ => {}
            }

            decls.push(Spaced::new(spacing_after(prev_end_row, child), decl));
            prev_end_row = Some(child.end_position().row);
        }

        let file = SourceFile { decls };
        if file.package().is_none() {
            return Err(TracerError::Parse {
                line: 1,
                column: 1,
                message: "expected package clause".to_string(),
            });
        }
        Ok(file)
    }

    fn convert_decl(&self, node: Node, source: &str) -> Result<Decl> {
        match node.kind() {
            "package_clause" => {
                let mut cursor = node.walk();
                let name = node
                    .named_children(&mut cursor)
                    .find(|n| n.kind() == "package_identifier")
                    .ok_or_else(|| error_at(node, "package clause without a name"))?;
                Ok(Decl::Package(self.get_node_text(name, source).to_string()))
            }

            "import_declaration" => Ok(Decl::Import(self.convert_import(node, source))),

            "function_declaration" | "method_declaration" => {
                Ok(Decl::Func(self.convert_func(node, source)?))
            }

            "comment" => Ok(Decl::Comment(self.get_node_text(node, source).to_string())),

            "var_declaration" | "const_declaration" | "type_declaration" => {
                let mut names = Vec::new();
                self.declared_names(node, source, &mut names);
                Ok(Decl::Named(NamedDecl {
                    text: self.get_node_text(node, source).to_string(),
                    names,
                }))
            }

            _ => Ok(Decl::Opaque(self.get_node_text(node, source).to_string())),
        }
    }

    fn convert_import(&self, node: Node, source: &str) -> ImportDecl {
        let mut specs = Vec::new();
        self.collect_import_specs(node, source, &mut specs);
        ImportDecl {
            text: self.get_node_text(node, source).to_string(),
            specs,
        }
    }

    fn collect_import_specs(&self, node: Node, source: &str, specs: &mut Vec<ImportSpec>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => {
                    if let Some(path) = child.child_by_field_name("path") {
                        specs.push(ImportSpec {
                            name: child
                                .child_by_field_name("name")
                                .map(|n| self.get_node_text(n, source).to_string()),
                            path: unquote(self.get_node_text(path, source)).to_string(),
                        });
                    }
                }
                "import_spec_list" => self.collect_import_specs(child, source, specs),
                _ => {}
            }
        }
    }

    fn convert_func(&self, node: Node, source: &str) -> Result<FuncDecl> {
        let field = |name: &str| {
            node.child_by_field_name(name)
                .map(|n| self.get_node_text(n, source).to_string())
        };

        let name = field("name").ok_or_else(|| error_at(node, "function without a name"))?;
        let params =
            field("parameters").ok_or_else(|| error_at(node, "function without parameters"))?;
        let body_node = node.child_by_field_name("body");
        let body_start = body_node.map_or(node.end_byte(), |b| b.start_byte());

        let mut cursor = node.walk();
        let comments = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "comment" && child.start_byte() < body_start)
            .map(|child| self.get_node_text(child, source).to_string())
            .collect();

        Ok(FuncDecl {
            receiver: field("receiver"),
            name,
            type_params: field("type_parameters"),
            params,
            result: field("result"),
            comments,
            body: body_node.map(|b| self.convert_block(b, source)),
        })
    }

    /// Identifiers bound by a type/var/const declaration
    fn declared_names(&self, node: Node, source: &str, names: &mut Vec<String>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "var_spec" | "const_spec" | "type_spec" | "type_alias" => {
                    let mut name_cursor = child.walk();
                    names.extend(
                        child
                            .children_by_field_name("name", &mut name_cursor)
                            .filter(|n| matches!(n.kind(), "identifier" | "type_identifier"))
                            .map(|n| self.get_node_text(n, source))
                            .filter(|name| *name != "_")
                            .map(str::to_string),
                    );
                }
                "var_spec_list" | "const_spec_list" | "type_spec_list" => {
                    self.declared_names(child, source, names)
                }
                _ => {}
            }
        }
    }

    fn convert_block(&self, node: Node, source: &str) -> Block {
        let mut stmts = Vec::new();
        let mut prev_end_row = Some(node.start_position().row);

        for item in block_items(node) {
            let text = self.get_node_text(item, source).to_string();
            let stmt = if item.kind() == "comment" {
                Stmt::Comment(text)
            } else {
                Stmt::Opaque(text)
            };
            stmts.push(Spaced::new(spacing_after(prev_end_row, item), stmt));
            prev_end_row = Some(item.end_position().row);
        }

        Block::new(stmts)
    }

    fn get_node_text<'a>(&self, node: Node, source: &'a str) -> &'a str {
        &source[node.byte_range()]
    }
}

impl Parser for GoParser {
    fn parse(&mut self, source: &str) -> Result<SourceFile> {
        let tree = self.parser.parse(source, None).ok_or_else(|| TracerError::Parse {
            line: 1,
            column: 1,
            message: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let node = find_error(root).unwrap_or(root);
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                format!("unexpected syntax near {:?}", snippet(&source[node.byte_range()]))
            };
            return Err(error_at(node, &message));
        }

        self.convert_source_file(root, source)
    }

    fn name(&self) -> &'static str {
        "go"
    }
}

/// Statements and comments of a block, with statement lists flattened
fn block_items(node: Node) -> Vec<Node> {
    let mut items = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "statement_list" => items.extend(block_items(child)),
            "empty_statement" => {}
            _ => items.push(child),
        }
    }
    items
}

fn spacing_after(prev_end_row: Option<usize>, node: Node) -> Spacing {
    let row = node.start_position().row;
    match prev_end_row {
        Some(prev) if row == prev => Spacing::SameLine,
        Some(prev) if row > prev + 1 => Spacing::BlankLine,
        _ => Spacing::Newline,
    }
}

fn find_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = find_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn error_at(node: Node, message: &str) -> TracerError {
    let position = node.start_position();
    TracerError::Parse {
        line: position.row + 1,
        column: position.column + 1,
        message: message.to_string(),
    }
}

fn unquote(literal: &str) -> &str {
    if literal.len() >= 2 {
        &literal[1..literal.len() - 1]
    } else {
        literal
    }
}

fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    line.chars().take(40).collect()
}
