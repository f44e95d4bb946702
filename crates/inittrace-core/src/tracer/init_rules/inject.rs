/*!
# Diagnostic Injection

Prepends `fmt.Println("<package>", "<file>")` to the body of every package
initializer, importing the logging package when the file does not already.
*/

use anyhow::bail;

use crate::ast::{CallStmt, FuncDecl, SourceFile, Stmt};
use crate::tracer::patterns::locate_initializers;
use crate::tracer::rules::TransformationRule;
use crate::tracer::{TransformResult, TransformationContext};

/// Build the diagnostic call naming a unit and a file
pub fn diagnostic_call(qualifier: Option<&str>, function: &str, unit: &str, file_name: &str) -> CallStmt {
    CallStmt {
        qualifier: qualifier.map(str::to_string),
        function: function.to_string(),
        args: vec![unit.to_string(), file_name.to_string()],
    }
}

/// Make `call` the first statement of `func`
///
/// Returns false for declarations without a body.
pub fn inject(func: &mut FuncDecl, call: CallStmt) -> bool {
    match func.body.as_mut() {
        Some(body) => {
            body.prepend(Stmt::Call(call));
            true
        }
        None => false,
    }
}

/// Traces entry into every `func init()` of a file
pub struct InjectDiagnostic {
    priority: u32,
    log_package: String,
    log_function: String,
}

impl InjectDiagnostic {
    pub fn new(log_package: &str, log_function: &str) -> Self {
        Self {
            priority: 300,
            log_package: log_package.to_string(),
            log_function: log_function.to_string(),
        }
    }

    fn is_diagnostic(&self, stmt: Option<&Stmt>) -> bool {
        matches!(stmt, Some(Stmt::Call(call)) if call.function == self.log_function)
    }
}

impl Default for InjectDiagnostic {
    fn default() -> Self {
        Self::new("fmt", "Println")
    }
}

impl TransformationRule for InjectDiagnostic {
    fn name(&self) -> &'static str {
        "InjectDiagnostic"
    }

    fn description(&self) -> &'static str {
        "Prepends a call printing the package and file name to every package initializer"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn matches(&self, file: &SourceFile, _context: &TransformationContext) -> bool {
        !locate_initializers(file).is_empty()
    }

    fn transform(&self, file: &mut SourceFile, context: &TransformationContext) -> TransformResult<usize> {
        if locate_initializers(file).is_empty() {
            return Ok(0);
        }
        let Some(unit) = file.package().map(str::to_string) else {
            bail!("file has no package clause");
        };

        // may insert an import declaration and shift indices
        let qualifier = file.ensure_import(&self.log_package);
        let call = diagnostic_call(Some(&qualifier), &self.log_function, &unit, context.file_name());

        let mut injected = 0;
        for index in locate_initializers(file) {
            if let Some(func) = file.func_mut(index) {
                if inject(func, call.clone()) {
                    injected += 1;
                }
            }
        }
        Ok(injected)
    }

    fn validate(&self, original: &SourceFile, transformed: &SourceFile, _context: &TransformationContext) -> TransformResult<()> {
        let before = locate_initializers(original).len();
        let after = locate_initializers(transformed);
        if before != after.len() {
            bail!("initializer count changed from {before} to {}", after.len());
        }
        for index in after {
            let first = transformed
                .func(index)
                .and_then(|f| f.body.as_ref())
                .and_then(|b| b.stmts.first())
                .map(|s| &s.node);
            if !self.is_diagnostic(first) {
                bail!("initializer at declaration {index} does not start with the diagnostic call");
            }
        }
        Ok(())
    }
}
