// Source code generation from the syntax tree
// Produces gofmt-like layout: one declaration per line group, statements
// indented by a tab, verbatim fragments emitted exactly as parsed.

use super::*;
use crate::{Result, TracerError};

/// Trait for types that can generate their source code representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

/// Render a whole file, refusing trees that would not produce valid Go
pub fn render(file: &SourceFile) -> Result<String> {
    validate(file)?;
    Ok(file.to_source())
}

impl ToSource for SourceFile {
    fn to_source(&self) -> String {
        let mut out = String::new();
        let mut prev_line_comment = false;

        for (i, decl) in self.decls.iter().enumerate() {
            let is_comment = matches!(decl.node, Decl::Comment(_));
            if i > 0 {
                out.push_str(separator(decl.spacing, is_comment, prev_line_comment));
            }
            let text = decl.node.to_source();
            prev_line_comment = is_comment && text.starts_with("//");
            out.push_str(&text);
        }

        out.push('\n');
        out
    }
}

impl ToSource for Decl {
    fn to_source(&self) -> String {
        match self {
            Decl::Package(name) => format!("package {name}"),
            Decl::Import(import) => import.text.clone(),
            Decl::Func(func) => func.to_source(),
            Decl::Named(named) => named.text.clone(),
            Decl::Comment(text) | Decl::Opaque(text) => text.clone(),
        }
    }
}

impl ToSource for FuncDecl {
    fn to_source(&self) -> String {
        let mut result = String::from("func ");
        if let Some(receiver) = &self.receiver {
            result.push_str(receiver);
            result.push(' ');
        }
        result.push_str(&self.name);
        if let Some(type_params) = &self.type_params {
            result.push_str(type_params);
        }
        result.push_str(&self.params);
        if let Some(ret) = &self.result {
            result.push(' ');
            result.push_str(ret);
        }
        for comment in &self.comments {
            result.push(' ');
            result.push_str(comment);
        }
        if let Some(body) = &self.body {
            result.push(' ');
            result.push_str(&body.to_source());
        }
        result
    }
}

impl ToSource for Block {
    fn to_source(&self) -> String {
        if self.stmts.is_empty() {
            return "{}".to_string();
        }

        let mut result = String::from("{");
        let mut prev_line_comment = false;

        for stmt in &self.stmts {
            let is_comment = matches!(stmt.node, Stmt::Comment(_));
            let sep = separator(stmt.spacing, is_comment, prev_line_comment);
            result.push_str(sep);
            if sep != " " {
                result.push('\t');
            }
            let text = stmt.node.to_source();
            prev_line_comment = is_comment && text.starts_with("//");
            result.push_str(&text);
        }

        result.push_str("\n}");
        result
    }
}

impl ToSource for Stmt {
    fn to_source(&self) -> String {
        match self {
            Stmt::Opaque(text) | Stmt::Comment(text) => text.clone(),
            Stmt::Call(call) => call.to_source(),
        }
    }
}

impl ToSource for CallStmt {
    fn to_source(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|arg| quote_go_string(arg))
            .collect::<Vec<_>>()
            .join(", ");
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}({})", qualifier, self.function, args),
            None => format!("{}({})", self.function, args),
        }
    }
}

// Only comments may share a line with what precedes them, and nothing can
// follow a line comment on its own line.
fn separator(spacing: Spacing, is_comment: bool, prev_line_comment: bool) -> &'static str {
    match spacing {
        Spacing::SameLine if is_comment && !prev_line_comment => " ",
        Spacing::BlankLine => "\n\n",
        _ => "\n",
    }
}

/// Quote a string as a Go interpreted string literal
pub fn quote_go_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn validate(file: &SourceFile) -> Result<()> {
    let mut seen_package = false;

    for decl in &file.decls {
        match &decl.node {
            Decl::Comment(text) => check_comment(text)?,
            Decl::Package(name) => {
                if seen_package {
                    return Err(TracerError::Serialization("duplicate package clause".to_string()));
                }
                check_identifier(name, "package name")?;
                seen_package = true;
            }
            _ if !seen_package => {
                return Err(TracerError::Serialization(
                    "declaration before package clause".to_string(),
                ));
            }
            Decl::Func(func) => check_func(func)?,
            Decl::Import(import) => {
                if !import.text.starts_with("import") {
                    return Err(TracerError::Serialization(format!(
                        "malformed import declaration: {}",
                        import.text
                    )));
                }
            }
            Decl::Named(NamedDecl { text, .. }) | Decl::Opaque(text) => {
                if text.trim().is_empty() {
                    return Err(TracerError::Serialization("empty declaration".to_string()));
                }
            }
        }
    }

    if !seen_package {
        return Err(TracerError::Serialization("missing package clause".to_string()));
    }
    Ok(())
}

fn check_func(func: &FuncDecl) -> Result<()> {
    check_identifier(&func.name, "function name")?;
    if !(func.params.starts_with('(') && func.params.ends_with(')')) {
        return Err(TracerError::Serialization(format!(
            "function {} has a malformed parameter list: {}",
            func.name, func.params
        )));
    }
    for comment in &func.comments {
        check_comment(comment)?;
        // a line comment would swallow the opening brace
        if func.body.is_some() && comment.starts_with("//") {
            return Err(TracerError::Serialization(format!(
                "line comment before the body of {}",
                func.name
            )));
        }
    }

    let Some(body) = &func.body else {
        return Ok(());
    };
    for stmt in &body.stmts {
        match &stmt.node {
            Stmt::Call(call) => {
                check_identifier(&call.function, "called function")?;
                if let Some(qualifier) = &call.qualifier {
                    check_identifier(qualifier, "package qualifier")?;
                }
            }
            Stmt::Comment(text) => check_comment(text)?,
            Stmt::Opaque(text) => {
                if text.trim().is_empty() {
                    return Err(TracerError::Serialization(format!(
                        "empty statement in {}",
                        func.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_identifier(name: &str, what: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(TracerError::Serialization(format!("invalid {what}: {name:?}")))
    }
}

fn check_comment(text: &str) -> Result<()> {
    if text.starts_with("//") || (text.starts_with("/*") && text.ends_with("*/")) {
        Ok(())
    } else {
        Err(TracerError::Serialization(format!("malformed comment: {text:?}")))
    }
}
