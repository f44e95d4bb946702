/*!
# Initializer Cloning

Appends a copy of every package initializer, under a fresh name, to the end
of the file. Copies are taken after diagnostic injection, so they include
the injected call.
*/

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::bail;

use crate::ast::{Decl, SourceFile};
use crate::tracer::idents::IdentSupplier;
use crate::tracer::patterns::locate_initializers;
use crate::tracer::rules::TransformationRule;
use crate::tracer::{TransformResult, TransformationContext};

/// Redraws allowed when a generated name is already taken
const DEFAULT_MAX_ATTEMPTS: usize = 16;

pub struct CloneInitializers {
    priority: u32,
    supplier: Arc<dyn IdentSupplier>,
    prefix: String,
    max_attempts: usize,
}

impl CloneInitializers {
    pub fn new(supplier: Arc<dyn IdentSupplier>) -> Self {
        Self {
            priority: 200,
            supplier,
            prefix: "init".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Prefix put in front of every generated name
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn fresh_name(&self, taken: &HashSet<String>) -> TransformResult<String> {
        for _ in 0..self.max_attempts {
            let name = format!("{}{}", self.prefix, self.supplier.next_ident());
            if !taken.contains(&name) {
                return Ok(name);
            }
        }
        bail!("no unused function name after {} attempts", self.max_attempts)
    }
}

impl TransformationRule for CloneInitializers {
    fn name(&self) -> &'static str {
        "CloneInitializers"
    }

    fn description(&self) -> &'static str {
        "Appends a renamed copy of every package initializer to the end of the file"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn matches(&self, file: &SourceFile, _context: &TransformationContext) -> bool {
        !locate_initializers(file).is_empty()
    }

    fn transform(&self, file: &mut SourceFile, _context: &TransformationContext) -> TransformResult<usize> {
        let mut taken: HashSet<String> = file.bound_names().into_iter().map(str::to_string).collect();

        let mut clones = Vec::new();
        for index in locate_initializers(file) {
            let Some(func) = file.func(index) else { continue };
            let name = self.fresh_name(&taken)?;
            taken.insert(name.clone());
            clones.push(func.clone_renamed(&name));
        }

        let count = clones.len();
        for clone in clones {
            file.push_decl(Decl::Func(clone));
        }
        Ok(count)
    }

    fn validate(&self, original: &SourceFile, transformed: &SourceFile, _context: &TransformationContext) -> TransformResult<()> {
        let initializers = locate_initializers(original).len();
        let added = transformed.decls.len().saturating_sub(original.decls.len());
        if added != initializers {
            bail!("expected {initializers} clones, found {added} new declarations");
        }

        let names = transformed.function_names();
        let unique: HashSet<&str> = names.iter().copied().collect();
        // Go allows any number of init functions; only the clones must be unique
        let duplicates = names.len() - unique.len();
        let init_duplicates = names.iter().filter(|n| **n == "init").count().saturating_sub(1);
        if duplicates != init_duplicates {
            bail!("clone names collide with existing functions");
        }
        Ok(())
    }
}
