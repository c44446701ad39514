mod expr;
pub mod printer;
mod parser;
mod stmt;
mod value;

pub use expr::{Expr, ExprVisitor, Resolution, Resolved};
pub use parser::Parser;
pub use stmt::{FunDecl, Stmt, StmtVisitor};
pub use value::Literal;
