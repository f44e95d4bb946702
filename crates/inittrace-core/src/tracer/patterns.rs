/*!
# Declaration Pattern Matching

Predicates over function declarations and the locator that applies them to
a file. The locator returns indices into `SourceFile::decls`, in source
order, so callers can mutate the matched declarations afterwards.
*/

use crate::ast::{Decl, FuncDecl, SourceFile};

/// Name of Go's package initializer
pub const INITIALIZER_NAME: &str = "init";

/// Pattern matcher for function declarations
pub trait AstPattern {
    /// Check if this pattern matches the given declaration
    fn matches(&self, func: &FuncDecl) -> bool;
}

/// Pattern matcher utility
pub struct PatternMatcher;

impl PatternMatcher {
    /// Match any declaration satisfying a predicate
    pub fn predicate<F>(predicate: F) -> impl AstPattern
    where
        F: Fn(&FuncDecl) -> bool,
    {
        PredicateMatcher { predicate }
    }

    /// Match declarations with exactly this name
    pub fn named(name: &str) -> NameMatcher {
        NameMatcher {
            name: name.to_string(),
        }
    }

    /// Match package-level functions (no receiver)
    pub fn function() -> impl AstPattern {
        PredicateMatcher {
            predicate: |f: &FuncDecl| !f.is_method(),
        }
    }

    /// Match methods
    pub fn method() -> impl AstPattern {
        PredicateMatcher {
            predicate: |f: &FuncDecl| f.is_method(),
        }
    }

    /// Match `()` parameter lists, no results and no type parameters
    pub fn nullary() -> impl AstPattern {
        PredicateMatcher {
            predicate: |f: &FuncDecl| {
                f.takes_no_params() && f.result.is_none() && f.type_params.is_none()
            },
        }
    }

    /// Match declarations that have a body
    pub fn with_body() -> impl AstPattern {
        PredicateMatcher {
            predicate: |f: &FuncDecl| f.body.is_some(),
        }
    }

    /// Match Go package initializers: `func init() { ... }`
    pub fn initializer() -> InitializerMatcher {
        InitializerMatcher
    }

    /// Combine patterns with AND logic
    pub fn all<P1: AstPattern, P2: AstPattern>(p1: P1, p2: P2) -> AndPattern<P1, P2> {
        AndPattern { p1, p2 }
    }

    /// Combine patterns with OR logic
    pub fn any<P1: AstPattern, P2: AstPattern>(p1: P1, p2: P2) -> OrPattern<P1, P2> {
        OrPattern { p1, p2 }
    }

    /// Negate a pattern
    pub fn not<P: AstPattern>(pattern: P) -> NotPattern<P> {
        NotPattern { pattern }
    }
}

/// Generic predicate matcher
struct PredicateMatcher<F>
where
    F: Fn(&FuncDecl) -> bool,
{
    predicate: F,
}

impl<F> AstPattern for PredicateMatcher<F>
where
    F: Fn(&FuncDecl) -> bool,
{
    fn matches(&self, func: &FuncDecl) -> bool {
        (self.predicate)(func)
    }
}

/// Function name matcher
pub struct NameMatcher {
    name: String,
}

impl AstPattern for NameMatcher {
    fn matches(&self, func: &FuncDecl) -> bool {
        func.name == self.name
    }
}

/// Zero-argument `init` function with a body and no receiver
pub struct InitializerMatcher;

impl AstPattern for InitializerMatcher {
    fn matches(&self, func: &FuncDecl) -> bool {
        func.name == INITIALIZER_NAME
            && !func.is_method()
            && func.takes_no_params()
            && func.result.is_none()
            && func.type_params.is_none()
            && func.body.is_some()
    }
}

/// AND pattern combinator
pub struct AndPattern<P1, P2> {
    p1: P1,
    p2: P2,
}

impl<P1: AstPattern, P2: AstPattern> AstPattern for AndPattern<P1, P2> {
    fn matches(&self, func: &FuncDecl) -> bool {
        self.p1.matches(func) && self.p2.matches(func)
    }
}

/// OR pattern combinator
pub struct OrPattern<P1, P2> {
    p1: P1,
    p2: P2,
}

impl<P1: AstPattern, P2: AstPattern> AstPattern for OrPattern<P1, P2> {
    fn matches(&self, func: &FuncDecl) -> bool {
        self.p1.matches(func) || self.p2.matches(func)
    }
}

/// NOT pattern combinator
pub struct NotPattern<P> {
    pattern: P,
}

impl<P: AstPattern> AstPattern for NotPattern<P> {
    fn matches(&self, func: &FuncDecl) -> bool {
        !self.pattern.matches(func)
    }
}

/// Indices of the function declarations matching `pattern`, in source order
pub fn locate<P: AstPattern + ?Sized>(file: &SourceFile, pattern: &P) -> Vec<usize> {
    file.decls
        .iter()
        .enumerate()
        .filter_map(|(index, decl)| match &decl.node {
            Decl::Func(func) if pattern.matches(func) => Some(index),
            _ => None,
        })
        .collect()
}

/// Indices of every package initializer in `file`
pub fn locate_initializers(file: &SourceFile) -> Vec<usize> {
    locate(file, &InitializerMatcher)
}
