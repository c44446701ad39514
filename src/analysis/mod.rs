use crate::ast::Stmt;

mod diagnostic;
mod resolver;

pub use diagnostic::{Diagnostic, Severity};
pub use resolver::Resolver;

/// Resolves every variable reference in `stmts` to the frame and slot which
/// holds its binding, returning the problems found along the way.
///
/// This must run to completion before the program is interpreted, and the
/// program must not be executed if any of the returned diagnostics
/// [is fatal](Diagnostic::is_fatal).
pub fn resolve(stmts: &[Stmt]) -> Vec<Diagnostic> {
    let mut resolver = Resolver::default();
    let mut diagnostics = resolver.resolve(stmts);
    diagnostics.append(&mut resolver.finish());
    diagnostics
}
