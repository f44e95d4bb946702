/*!
# Initializer Tracing Rules

The two rules that make up the init tracer. Diagnostic injection has to run
before cloning so that every clone carries the diagnostic call too; their
priorities encode that order.
*/

pub mod clone;
pub mod inject;

use std::sync::Arc;

use crate::TracerConfig;

use super::idents::IdentSupplier;
use super::rules::TransformationRule;

// Re-export commonly used rules
pub use clone::CloneInitializers;
pub use inject::{diagnostic_call, inject, InjectDiagnostic};

/// The injector and the cloner configured from `config`, highest priority first
pub fn standard_rules(
    config: &TracerConfig,
    supplier: Arc<dyn IdentSupplier>,
) -> Vec<Box<dyn TransformationRule>> {
    let mut rules: Vec<Box<dyn TransformationRule>> = vec![
        Box::new(InjectDiagnostic::new(&config.log_package, &config.log_function)),
        Box::new(CloneInitializers::new(supplier).with_prefix(&config.clone_prefix)),
    ];
    rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
    rules
}
