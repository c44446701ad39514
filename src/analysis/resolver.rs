use std::rc::Rc;

use tracing::{debug, trace};

use crate::{ast::{Expr, ExprVisitor, FunDecl, Literal, Resolution, Resolved, Stmt, StmtVisitor}, lexer::Token, Loc};

use super::Diagnostic;

#[derive(Debug, PartialEq, Copy, Clone)]
enum ClassType {
    None,
    Class,
}

#[derive(Debug, PartialEq, Copy, Clone)]
enum FunctionType {
    None,
    Function,
    Method,
}

#[derive(Debug)]
struct Entry {
    name: String,
    loc: Loc,
    defined: bool,
    used: bool,
}

/// The bindings of one lexical region, in declaration order. An entry's index
/// is the slot its value occupies in the matching runtime frame.
#[derive(Debug, Default)]
struct Scope {
    entries: Vec<Entry>,
}

impl Scope {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }
}

/// Computes the `(depth, slot)` coordinate of every variable reference ahead of
/// execution and reports static problems with the program.
///
/// The outermost scope is the program's global scope and survives between
/// calls to [`Resolver::resolve`], so a single resolver can serve an
/// interactive session where the program arrives one line at a time.
#[derive(Debug)]
pub struct Resolver {
    scopes: Vec<Scope>,
    current_class: ClassType,
    current_function: FunctionType,
    loop_depth: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            scopes: vec![Scope::default()],
            current_class: ClassType::None,
            current_function: FunctionType::None,
            loop_depth: 0,
        }
    }
}

impl Resolver {
    /// Resolves `stmts` as a continuation of the program seen so far.
    ///
    /// If any fatal diagnostic is produced, the global declarations made by
    /// these statements are forgotten again since they will never be executed.
    pub fn resolve(&mut self, stmts: &[Stmt]) -> Vec<Diagnostic> {
        let used: Vec<bool> = self.scopes.first().map(|s| s.entries.iter().map(|e| e.used).collect()).unwrap_or_default();
        let diagnostics: Vec<Diagnostic> = stmts.iter().flat_map(|stmt| self.visit_stmt(stmt)).collect();

        if diagnostics.iter().any(Diagnostic::is_fatal) {
            if let Some(globals) = self.scopes.first_mut() {
                globals.entries.truncate(used.len());
                for (entry, used) in globals.entries.iter_mut().zip(used) {
                    entry.used = used;
                }
            }
        }

        debug!(statements = stmts.len(), diagnostics = diagnostics.len(), globals = self.global_slots(), "resolved program");
        diagnostics
    }

    /// The number of slots the global frame needs to hold every global declared so far.
    pub fn global_slots(&self) -> usize {
        self.scopes.first().map(|s| s.entries.len()).unwrap_or_default()
    }

    /// Closes the global scope, reporting any globals which were never used.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        while !self.scopes.is_empty() {
            diagnostics.append(&mut self.end_scope());
        }

        diagnostics
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
        trace!(depth = self.scopes.len(), "opened scope");
    }

    fn end_scope(&mut self) -> Vec<Diagnostic> {
        let Some(scope) = self.scopes.pop() else {
            return Vec::new();
        };

        trace!(depth = self.scopes.len() + 1, bindings = scope.entries.len(), "closed scope");

        scope.entries.into_iter()
            .filter(|entry| !entry.used)
            .map(|entry| Diagnostic::warning(
                entry.loc,
                format!("Variable '{}' declared at {} is never used.", entry.name, entry.loc),
                "Remove the declaration if you no longer need it, or make use of the variable.",
            ))
            .collect()
    }

    fn declare(&mut self, name: &Token) -> Option<Diagnostic> {
        let scope = self.scopes.last_mut()?;

        let duplicate = scope.position(name.lexeme()).map(|_| Diagnostic::error(
            name.location(),
            format!("Variable '{}' is already defined in this scope, duplicate declaration found at {}.", name.lexeme(), name.location()),
            "Remove the `var` keyword to assign a new value to this variable, or rename it if you intended to maintain a separate instance.",
        ));

        scope.entries.push(Entry {
            name: name.lexeme().to_string(),
            loc: name.location(),
            defined: false,
            used: false,
        });

        duplicate
    }

    fn define(&mut self, name: &str) {
        if let Some(entry) = self.scopes.last_mut().and_then(|s| s.entries.iter_mut().rev().find(|e| e.name == name)) {
            entry.defined = true;
        }
    }

    fn declare_synthetic(&mut self, name: &str, loc: Loc) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries.push(Entry { name: name.to_string(), loc, defined: true, used: true });
        }
    }

    fn resolve_local(&mut self, name: &str, resolved: &Resolution) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(slot) = scope.position(name) {
                scope.entries[slot].used = true;
                resolved.set(Some(Resolved { depth, slot }));
                trace!(name, depth, slot, "resolved binding");
                return;
            }
        }

        trace!(name, "binding left for dynamic lookup");
        resolved.set(None);
    }

    fn resolve_function(&mut self, decl: &FunDecl, ty: FunctionType) -> Vec<Diagnostic> {
        let enclosing_function = std::mem::replace(&mut self.current_function, ty);
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);

        self.begin_scope();

        let mut errs = Vec::new();
        for param in &decl.params {
            errs.extend(self.declare(param));
            self.define(param.lexeme());
        }

        for stmt in &decl.body {
            errs.append(&mut self.visit_stmt(stmt));
        }

        errs.append(&mut self.end_scope());

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;

        errs
    }

    fn resolve_loop_body(&mut self, body: &Stmt) -> Vec<Diagnostic> {
        self.loop_depth += 1;
        let errs = self.visit_stmt(body);
        self.loop_depth -= 1;
        errs
    }

    fn check_in_loop(&self, keyword: &Token) -> Vec<Diagnostic> {
        if self.loop_depth > 0 {
            return Vec::new();
        }

        vec![Diagnostic::error(
            keyword.location(),
            format!("Found a '{}' statement outside of a loop at {}.", keyword.lexeme(), keyword.location()),
            format!("You can only use the `{}` keyword within the body of a `while` or `for` loop.", keyword.lexeme()),
        )]
    }
}

impl ExprVisitor<Vec<Diagnostic>> for Resolver {
    fn visit_assign(&mut self, ident: &Token, value: &Expr, resolved: &Resolution) -> Vec<Diagnostic> {
        let errs = self.visit_expr(value);
        self.resolve_local(ident.lexeme(), resolved);
        errs
    }

    fn visit_binary(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(left),
            self.visit_expr(right),
        ].into_iter().flatten().collect()
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], _close: &Token) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(callee),
            args.iter().flat_map(|arg| self.visit_expr(arg)).collect(),
        ].into_iter().flatten().collect()
    }

    fn visit_comma(&mut self, left: &Expr, right: &Expr) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(left),
            self.visit_expr(right),
        ].into_iter().flatten().collect()
    }

    fn visit_fun_expr(&mut self, decl: &Rc<FunDecl>) -> Vec<Diagnostic> {
        self.resolve_function(decl, FunctionType::Function)
    }

    fn visit_get(&mut self, obj: &Expr, _property: &Token) -> Vec<Diagnostic> {
        self.visit_expr(obj)
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Vec<Diagnostic> {
        self.visit_expr(expr)
    }

    fn visit_literal(&mut self, _loc: &Loc, _value: &Literal) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn visit_logical(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(left),
            self.visit_expr(right),
        ].into_iter().flatten().collect()
    }

    fn visit_set(&mut self, obj: &Expr, _property: &Token, value: &Expr) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(obj),
            self.visit_expr(value),
        ].into_iter().flatten().collect()
    }

    fn visit_ternary(&mut self, cond: &Expr, then_value: &Expr, else_value: &Expr) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(cond),
            self.visit_expr(then_value),
            self.visit_expr(else_value),
        ].into_iter().flatten().collect()
    }

    fn visit_this(&mut self, keyword: &Token, resolved: &Resolution) -> Vec<Diagnostic> {
        if self.current_class == ClassType::None {
            return vec![Diagnostic::error(
                keyword.location(),
                format!("Found a usage of '{}' outside a class method at {}.", keyword.lexeme(), keyword.location()),
                "You can only access `this` within a class method.",
            )];
        }

        self.resolve_local(keyword.lexeme(), resolved);
        Vec::new()
    }

    fn visit_unary(&mut self, _op: &Token, expr: &Expr) -> Vec<Diagnostic> {
        self.visit_expr(expr)
    }

    fn visit_var_ref(&mut self, name: &Token, resolved: &Resolution) -> Vec<Diagnostic> {
        let in_own_initializer = self.scopes.last()
            .and_then(|s| s.position(name.lexeme()).map(|slot| !s.entries[slot].defined))
            .unwrap_or_default();

        self.resolve_local(name.lexeme(), resolved);

        if in_own_initializer {
            return vec![Diagnostic::error(
                name.location(),
                format!("Variable '{}' is read in its own initializer at {}.", name.lexeme(), name.location()),
                "Make sure you are not masking a variable with the same name and try using a different name for this variable if you are.",
            )];
        }

        Vec::new()
    }
}

impl StmtVisitor<Vec<Diagnostic>> for Resolver {
    fn visit_block(&mut self, stmts: &[Stmt]) -> Vec<Diagnostic> {
        self.begin_scope();

        let mut errs = Vec::new();
        for stmt in stmts {
            errs.append(&mut self.visit_stmt(stmt));
        }

        errs.append(&mut self.end_scope());
        errs
    }

    fn visit_break(&mut self, keyword: &Token) -> Vec<Diagnostic> {
        self.check_in_loop(keyword)
    }

    fn visit_class(&mut self, name: &Token, methods: &[Rc<FunDecl>]) -> Vec<Diagnostic> {
        let mut errs: Vec<Diagnostic> = self.declare(name).into_iter().collect();
        self.define(name.lexeme());

        let enclosing_class = std::mem::replace(&mut self.current_class, ClassType::Class);

        // Methods are bound to an instance through a frame whose only slot is `this`.
        self.begin_scope();
        self.declare_synthetic("this", name.location());

        for method in methods {
            errs.append(&mut self.resolve_function(method, FunctionType::Method));
        }

        errs.append(&mut self.end_scope());
        self.current_class = enclosing_class;

        errs
    }

    fn visit_continue(&mut self, keyword: &Token) -> Vec<Diagnostic> {
        self.check_in_loop(keyword)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Vec<Diagnostic> {
        self.visit_expr(expr)
    }

    fn visit_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, incr: Option<&Expr>, body: &Stmt) -> Vec<Diagnostic> {
        self.begin_scope();

        let errs = vec![
            init.map(|s| self.visit_stmt(s)).unwrap_or_default(),
            cond.map(|e| self.visit_expr(e)).unwrap_or_default(),
            incr.map(|e| self.visit_expr(e)).unwrap_or_default(),
            self.resolve_loop_body(body),
            self.end_scope(),
        ];

        errs.into_iter().flatten().collect()
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> Vec<Diagnostic> {
        let mut errs = Vec::new();
        if let Some(name) = &decl.name {
            errs.extend(self.declare(name));
            self.define(name.lexeme());
        }

        errs.append(&mut self.resolve_function(decl, FunctionType::Function));
        errs
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(cond),
            self.visit_stmt(then_branch),
            else_branch.map(|b| self.visit_stmt(b)).unwrap_or_default(),
        ].into_iter().flatten().collect()
    }

    fn visit_print(&mut self, expr: &Expr) -> Vec<Diagnostic> {
        self.visit_expr(expr)
    }

    fn visit_return(&mut self, keyword: &Token, expr: Option<&Expr>) -> Vec<Diagnostic> {
        let mut errs = expr.map(|e| self.visit_expr(e)).unwrap_or_default();

        if self.current_function == FunctionType::None {
            errs.push(Diagnostic::error(
                keyword.location(),
                format!("Return statement used outside of a function at {}.", keyword.location()),
                "You can only use the `return` keyword within a function.",
            ));
        }

        errs
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> Vec<Diagnostic> {
        let mut errs: Vec<Diagnostic> = self.declare(name).into_iter().collect();
        if let Some(init) = init {
            errs.append(&mut self.visit_expr(init));
        }
        self.define(name.lexeme());
        errs
    }

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> Vec<Diagnostic> {
        vec![
            self.visit_expr(cond),
            self.resolve_loop_body(body),
        ].into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{analysis::{self, Diagnostic, Resolver}, ast::{Expr, Parser, Resolved, Stmt}, lexer::Scanner};

    fn parse(source: &str) -> Vec<Stmt> {
        let (tree, errs) = Parser::parse(&mut Scanner::new(source).filter_map(|t| t.ok()));
        assert!(errs.is_empty(), "no parsing errors, got {:?}", errs);
        tree
    }

    fn fatal(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().filter(|d| d.is_fatal()).map(|d| d.description()).collect()
    }

    fn resolution(expr: &Expr) -> Option<Resolved> {
        match expr {
            Expr::Var(_, resolved) | Expr::Assign(_, _, resolved) | Expr::This(_, resolved) => resolved.get(),
            other => panic!("expected a variable reference, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_local_variables() {
        let tree = parse("{ var a = 1; var a = 2; }");

        let errs = analysis::resolve(&tree);
        assert_eq!(fatal(&errs), vec!["Variable 'a' is already defined in this scope, duplicate declaration found at line 1, column 18."]);
    }

    #[test]
    fn duplicate_parameters() {
        let tree = parse("fun f(a, a) { return a; } f(1, 2);");

        let errs = analysis::resolve(&tree);
        assert_eq!(fatal(&errs), vec!["Variable 'a' is already defined in this scope, duplicate declaration found at line 1, column 10."]);
    }

    #[test]
    fn shadowing_resolves_to_innermost_scope() {
        let tree = parse("var x = 1; { var x = 2; print x; } print x;");
        let errs = analysis::resolve(&tree);
        assert!(fatal(&errs).is_empty());

        let Stmt::Block(block) = &tree[1] else { panic!("expected a block") };
        let Stmt::Print(inner) = &block[1] else { panic!("expected a print statement") };
        assert_eq!(resolution(inner), Some(Resolved { depth: 0, slot: 0 }));

        let Stmt::Print(outer) = &tree[2] else { panic!("expected a print statement") };
        assert_eq!(resolution(outer), Some(Resolved { depth: 0, slot: 0 }));
    }

    #[test]
    fn enclosing_scopes_are_counted_by_depth() {
        let tree = parse("var a = 1; var x = 2; { var y = 3; print x + y; }");
        let errs = analysis::resolve(&tree);
        assert!(fatal(&errs).is_empty());

        let Stmt::Block(block) = &tree[2] else { panic!("expected a block") };
        let Stmt::Print(Expr::Binary(x, _, y)) = &block[1] else { panic!("expected a print statement") };
        assert_eq!(resolution(x), Some(Resolved { depth: 1, slot: 1 }));
        assert_eq!(resolution(y), Some(Resolved { depth: 0, slot: 0 }));
    }

    #[test]
    fn parameters_take_slots_in_declaration_order() {
        let tree = parse("fun f(a, b) { return b + a; } f(1, 2);");
        assert!(fatal(&analysis::resolve(&tree)).is_empty());

        let Stmt::Fun(decl) = &tree[0] else { panic!("expected a function") };
        let Stmt::Return(_, Some(Expr::Binary(b, _, a))) = &decl.body[0] else { panic!("expected a return statement") };
        assert_eq!(resolution(b), Some(Resolved { depth: 0, slot: 1 }));
        assert_eq!(resolution(a), Some(Resolved { depth: 0, slot: 0 }));
    }

    #[test]
    fn this_resolves_to_the_method_binding_frame() {
        let tree = parse("class A { m() { return this; } } A;");
        assert!(fatal(&analysis::resolve(&tree)).is_empty());

        let Stmt::Class(_, methods) = &tree[0] else { panic!("expected a class") };
        let Stmt::Return(_, Some(this)) = &methods[0].body[0] else { panic!("expected a return statement") };
        assert_eq!(resolution(this), Some(Resolved { depth: 1, slot: 0 }));
    }

    #[test]
    fn for_loop_header_has_its_own_scope() {
        let tree = parse("var a = 0; for (var i = 0; i < 3; i = i + 1) print i + a;");
        assert!(fatal(&analysis::resolve(&tree)).is_empty());

        let Stmt::For(_, _, _, body) = &tree[1] else { panic!("expected a for loop") };
        let Stmt::Print(Expr::Binary(i, _, a)) = body.as_ref() else { panic!("expected a print statement") };
        assert_eq!(resolution(i), Some(Resolved { depth: 0, slot: 0 }));
        assert_eq!(resolution(a), Some(Resolved { depth: 1, slot: 0 }));
    }

    #[test]
    fn unknown_names_are_left_for_dynamic_lookup() {
        let tree = parse("print clock();");
        assert!(analysis::resolve(&tree).is_empty());

        let Stmt::Print(Expr::Call(callee, _, _)) = &tree[0] else { panic!("expected a call") };
        assert_eq!(resolution(callee), None);
    }

    #[test]
    fn reading_in_own_initializer() {
        let tree = parse("{ var a = 1; { var a = a; } }");

        let errs = analysis::resolve(&tree);
        assert_eq!(fatal(&errs), vec!["Variable 'a' is read in its own initializer at line 1, column 24."]);
    }

    #[test]
    fn unused_locals_are_warnings() {
        let tree = parse("{ var a = 1; }");

        let errs = analysis::resolve(&tree);
        assert_eq!(errs.len(), 1, "expected 1 diagnostic");
        assert!(!errs[0].is_fatal());
        assert_eq!(errs[0].description(), "Variable 'a' declared at line 1, column 7 is never used.");
    }

    #[test]
    fn this_outside_class_method() {
        let tree = parse("var a = 1;\nthis.a = 2;");

        let errs = analysis::resolve(&tree);
        assert_eq!(fatal(&errs), vec!["Found a usage of 'this' outside a class method at line 2, column 1."]);
    }

    #[test]
    fn return_outside_function() {
        let tree = parse("return 1;");

        let errs = analysis::resolve(&tree);
        assert_eq!(fatal(&errs), vec!["Return statement used outside of a function at line 1, column 1."]);
    }

    #[test]
    fn loop_control_outside_loop() {
        let tree = parse("break;\nwhile (true) { fun f() { continue; } f(); }");

        let errs = analysis::resolve(&tree);
        assert_eq!(fatal(&errs), vec![
            "Found a 'break' statement outside of a loop at line 1, column 1.",
            "Found a 'continue' statement outside of a loop at line 2, column 26.",
        ]);
    }

    #[test]
    fn failed_lines_do_not_declare_globals() {
        let mut resolver = Resolver::default();

        assert!(resolver.resolve(&parse("var a = 1;")).is_empty());
        assert_eq!(resolver.global_slots(), 1);

        assert_eq!(fatal(&resolver.resolve(&parse("var b = b;"))).len(), 1);
        assert_eq!(resolver.global_slots(), 1);

        assert!(resolver.resolve(&parse("var c = a;")).is_empty());
        assert_eq!(resolver.global_slots(), 2);

        let unused: Vec<String> = resolver.finish().iter().map(|d| d.description().to_string()).collect();
        assert_eq!(unused, vec!["Variable 'c' declared at line 1, column 5 is never used."]);
    }

    #[test]
    fn failed_lines_do_not_mark_globals_used() {
        let mut resolver = Resolver::default();

        assert!(resolver.resolve(&parse("var a = 1;")).is_empty());
        assert_eq!(fatal(&resolver.resolve(&parse("print a; var b = b;"))).len(), 1);

        let unused: Vec<String> = resolver.finish().iter().map(|d| d.description().to_string()).collect();
        assert_eq!(unused, vec!["Variable 'a' declared at line 1, column 5 is never used."]);
    }
}
