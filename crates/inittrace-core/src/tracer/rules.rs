/*!
# Transformation Rules

Core trait and utilities for defining transformation rules.
*/

use crate::ast::SourceFile;
use super::{TransformResult, TransformationContext};

/// Core trait for transformation rules
///
/// A rule inspects a parsed file and mutates it in place. Rules run once per
/// file, in descending priority order; none of them is expected to be
/// idempotent.
pub trait TransformationRule: Send + Sync {
    /// Human-readable name for this rule
    fn name(&self) -> &'static str;

    /// Detailed description of what this rule does
    fn description(&self) -> &'static str;

    /// Priority for rule ordering (higher priority runs first)
    fn priority(&self) -> u32 {
        100
    }

    /// Check if this rule applies to the given file
    fn matches(&self, file: &SourceFile, context: &TransformationContext) -> bool;

    /// Apply the transformation, returning how many declarations changed
    fn transform(&self, file: &mut SourceFile, context: &TransformationContext) -> TransformResult<usize>;

    /// Check the result of `transform` against the file it started from
    fn validate(&self, original: &SourceFile, transformed: &SourceFile, context: &TransformationContext) -> TransformResult<()> {
        // Default implementation does no validation
        let _ = (original, transformed, context);
        Ok(())
    }
}

/// Rule execution statistics
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct RuleStats {
    pub rule_name: String,
    /// Files the rule matched
    pub applications: u64,
    /// Files the rule actually changed
    pub transformations: u64,
    /// Declarations changed across all files
    pub changes: u64,
    pub total_time_ms: u64,
}

impl RuleStats {
    pub fn new(rule_name: String) -> Self {
        Self {
            rule_name,
            ..Default::default()
        }
    }

    pub fn record(&mut self, changes: usize, elapsed_ms: u64) {
        self.applications += 1;
        if changes > 0 {
            self.transformations += 1;
        }
        self.changes += changes as u64;
        self.total_time_ms += elapsed_ms;
    }

    pub fn success_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.transformations as f64) / (self.applications as f64)
        }
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.total_time_ms as f64) / (self.applications as f64)
        }
    }
}
