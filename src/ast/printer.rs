use std::rc::Rc;

use crate::{lexer::Token, Loc};

use super::{Expr, ExprVisitor, FunDecl, Literal, Resolution, StmtVisitor, Stmt};

pub struct AstPrinter{}

impl AstPrinter {
    fn function(&mut self, decl: &FunDecl) -> String {
        let mut s = format!("(fun {}", decl.name.as_ref().map(|n| n.lexeme()).unwrap_or("@anonymous"));
        for param in &decl.params {
            s.push(' ');
            s.push_str(param.lexeme());
        }
        s.push(' ');
        s.push_str(&self.visit_block(&decl.body));
        s.push(')');
        s
    }
}

impl ExprVisitor<String> for AstPrinter {
    fn visit_assign(&mut self, ident: &Token, value: &Expr, _resolved: &Resolution) -> String {
        format!("(= {} {})", ident.lexeme(), self.visit_expr(value))
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        format!("({} {} {})", op.lexeme(), self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], _close: &Token) -> String {
        let mut s = format!("(call {}", self.visit_expr(callee));
        for arg in args {
            s.push(' ');
            s.push_str(&self.visit_expr(arg));
        }
        s.push(')');
        s
    }

    fn visit_comma(&mut self, left: &Expr, right: &Expr) -> String {
        format!("(, {} {})", self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_fun_expr(&mut self, decl: &Rc<FunDecl>) -> String {
        self.function(decl)
    }

    fn visit_get(&mut self, obj: &Expr, name: &Token) -> String {
        format!("{}.{}", self.visit_expr(obj), name.lexeme())
    }

    fn visit_grouping(&mut self, expr: &Expr) -> String {
        format!("(group {})", self.visit_expr(expr))
    }

    fn visit_literal(&mut self, _loc: &Loc, value: &Literal) -> String {
        match value {
            Literal::String(string) => format!("\"{}\"", string),
            value => value.to_string(),
        }
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        format!("({} {} {})", op.lexeme(), self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_set(&mut self, obj: &Expr, name: &Token, value: &Expr) -> String {
        format!("(set {}.{} {})", self.visit_expr(obj), name.lexeme(), self.visit_expr(value))
    }

    fn visit_ternary(&mut self, cond: &Expr, then_value: &Expr, else_value: &Expr) -> String {
        format!("(?: {} {} {})", self.visit_expr(cond), self.visit_expr(then_value), self.visit_expr(else_value))
    }

    fn visit_this(&mut self, _keyword: &Token, _resolved: &Resolution) -> String {
        "this".to_string()
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> String {
        format!("({} {})", op.lexeme(), self.visit_expr(expr))
    }

    fn visit_var_ref(&mut self, name: &Token, _resolved: &Resolution) -> String {
        name.lexeme().to_string()
    }
}

impl StmtVisitor<String> for AstPrinter {
    fn visit_block(&mut self, stmts: &[Stmt]) -> String {
        let mut result = String::new();
        result.push_str("(block");
        for stmt in stmts {
            result.push(' ');
            result.push_str(&self.visit_stmt(stmt));
        }
        result.push(')');
        result
    }

    fn visit_break(&mut self, _keyword: &Token) -> String {
        "(break)".to_string()
    }

    fn visit_class(&mut self, name: &Token, methods: &[Rc<FunDecl>]) -> String {
        let mut result = String::new();
        result.push_str("(class ");
        result.push_str(name.lexeme());
        for method in methods {
            result.push(' ');
            result.push_str(&self.function(method));
        }
        result.push(')');
        result
    }

    fn visit_continue(&mut self, _keyword: &Token) -> String {
        "(continue)".to_string()
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> String {
        format!("({})", self.visit_expr(expr))
    }

    fn visit_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, incr: Option<&Expr>, body: &Stmt) -> String {
        let init = init.map(|s| self.visit_stmt(s)).unwrap_or_else(|| "_".to_string());
        let cond = cond.map(|e| self.visit_expr(e)).unwrap_or_else(|| "_".to_string());
        let incr = incr.map(|e| self.visit_expr(e)).unwrap_or_else(|| "_".to_string());
        format!("(for {} {} {} {})", init, cond, incr, self.visit_stmt(body))
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> String {
        self.function(decl)
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> String {
        let mut result = String::new();
        result.push_str("(if ");
        result.push_str(&self.visit_expr(cond));
        result.push(' ');
        result.push_str(&self.visit_stmt(then_branch));
        if let Some(else_branch) = else_branch {
            result.push(' ');
            result.push_str(&self.visit_stmt(else_branch));
        }
        result.push(')');
        result
    }

    fn visit_print(&mut self, expr: &Expr) -> String {
        format!("(print {})", self.visit_expr(expr))
    }

    fn visit_return(&mut self, _keyword: &Token, expr: Option<&Expr>) -> String {
        let mut result = String::new();
        result.push_str("(return");
        if let Some(expr) = expr {
            result.push(' ');
            result.push_str(&self.visit_expr(expr));
        }
        result.push(')');
        result
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> String {
        match init {
            Some(expr) => format!("(var {} {})", name.lexeme(), self.visit_expr(expr)),
            None => format!("(var {})", name.lexeme()),
        }
    }

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> String {
        format!("(while {} {})", self.visit_expr(cond), self.visit_stmt(body))
    }
}
