use std::{cell::Cell, rc::Rc};

use crate::{lexer::Token, Loc};

use super::{FunDecl, Literal};

/// The coordinate of a resolved binding: how many frames to walk up from the
/// executing frame, and which slot of that frame holds the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub depth: usize,
    pub slot: usize,
}

/// Filled in by the resolver. `None` means the name is looked up dynamically.
pub type Resolution = Cell<Option<Resolved>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Assign(Token, Box<Expr>, Resolution),
    Binary(Box<Expr>, Token, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>, Token),
    Comma(Box<Expr>, Box<Expr>),
    Fun(Rc<FunDecl>),
    Get(Box<Expr>, Token),
    Grouping(Box<Expr>),
    Literal(Loc, Literal),
    Logical(Box<Expr>, Token, Box<Expr>),
    Set(Box<Expr>, Token, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    This(Token, Resolution),
    Unary(Token, Box<Expr>),
    Var(Token, Resolution),
}

pub trait ExprVisitor<T> {
    fn visit_expr(&mut self, expr: &Expr) -> T {
        match expr {
            Expr::Assign(ident, value, resolved) => {
                self.visit_assign(ident, value, resolved)
            },
            Expr::Binary(left, op, right) => {
                self.visit_binary(left, op, right)
            },
            Expr::Call(callee, args, close) => {
                self.visit_call(callee, args, close)
            },
            Expr::Comma(left, right) => {
                self.visit_comma(left, right)
            },
            Expr::Fun(decl) => {
                self.visit_fun_expr(decl)
            },
            Expr::Get(obj, name) => {
                self.visit_get(obj, name)
            },
            Expr::Grouping(expr) => {
                self.visit_grouping(expr)
            },
            Expr::Literal(loc, value) => {
                self.visit_literal(loc, value)
            },
            Expr::Logical(left, op, right) => {
                self.visit_logical(left, op, right)
            },
            Expr::Set(obj, property, value) => {
                self.visit_set(obj, property, value)
            },
            Expr::Ternary(cond, then_value, else_value) => {
                self.visit_ternary(cond, then_value, else_value)
            },
            Expr::This(keyword, resolved) => {
                self.visit_this(keyword, resolved)
            },
            Expr::Unary(op, expr) => {
                self.visit_unary(op, expr)
            },
            Expr::Var(name, resolved) => {
                self.visit_var_ref(name, resolved)
            }
        }
    }

    fn visit_assign(&mut self, ident: &Token, value: &Expr, resolved: &Resolution) -> T;

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> T;

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], close: &Token) -> T;

    fn visit_comma(&mut self, left: &Expr, right: &Expr) -> T;

    fn visit_fun_expr(&mut self, decl: &Rc<FunDecl>) -> T;

    fn visit_get(&mut self, obj: &Expr, property: &Token) -> T;

    fn visit_grouping(&mut self, expr: &Expr) -> T;

    fn visit_literal(&mut self, loc: &Loc, value: &Literal) -> T;

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> T;

    fn visit_set(&mut self, obj: &Expr, property: &Token, value: &Expr) -> T;

    fn visit_ternary(&mut self, cond: &Expr, then_value: &Expr, else_value: &Expr) -> T;

    fn visit_this(&mut self, keyword: &Token, resolved: &Resolution) -> T;

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> T;

    fn visit_var_ref(&mut self, name: &Token, resolved: &Resolution) -> T;
}
