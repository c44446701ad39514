use std::rc::Rc;

use crate::{lexer::Token, Loc};

use super::*;

/// A function body shared by every closure created from the same declaration.
#[derive(Debug, PartialEq)]
pub struct FunDecl {
    pub loc: Loc,
    /// `None` for anonymous function expressions.
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

impl FunDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref().map(|n| n.lexeme()).unwrap_or("anonymous")
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Break(Token),
    Class(Token, Vec<Rc<FunDecl>>),
    Continue(Token),
    Expression(Expr),
    For(Option<Box<Stmt>>, Option<Expr>, Option<Expr>, Box<Stmt>),
    Fun(Rc<FunDecl>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Print(Expr),
    Return(Token, Option<Expr>),
    Var(Token, Option<Expr>),
    While(Expr, Box<Stmt>),
}

pub trait StmtVisitor<T> {
    fn visit_stmt(&mut self, stmt: &Stmt) -> T {
        match stmt {
            Stmt::Block(stmts) => self.visit_block(stmts),
            Stmt::Break(keyword) => self.visit_break(keyword),
            Stmt::Class(name, methods) => self.visit_class(name, methods),
            Stmt::Continue(keyword) => self.visit_continue(keyword),
            Stmt::Expression(expr) => self.visit_expr_stmt(expr),
            Stmt::For(init, cond, incr, body) => self.visit_for(init.as_deref(), cond.as_ref(), incr.as_ref(), body),
            Stmt::Fun(decl) => self.visit_fun_def(decl),
            Stmt::If(cond, then_branch, else_branch) => self.visit_if(cond, then_branch, else_branch.as_deref()),
            Stmt::Print(expr) => self.visit_print(expr),
            Stmt::Return(keyword, expr) => self.visit_return(keyword, expr.as_ref()),
            Stmt::Var(name, init) => self.visit_var_def(name, init.as_ref()),
            Stmt::While(cond, body) => self.visit_while(cond, body),
        }
    }

    fn visit_block(&mut self, stmts: &[Stmt]) -> T;

    fn visit_break(&mut self, keyword: &Token) -> T;

    fn visit_class(&mut self, name: &Token, methods: &[Rc<FunDecl>]) -> T;

    fn visit_continue(&mut self, keyword: &Token) -> T;

    fn visit_expr_stmt(&mut self, expr: &Expr) -> T;

    fn visit_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, incr: Option<&Expr>, body: &Stmt) -> T;

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> T;

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> T;

    fn visit_print(&mut self, expr: &Expr) -> T;

    fn visit_return(&mut self, keyword: &Token, expr: Option<&Expr>) -> T;

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> T;

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> T;
}
