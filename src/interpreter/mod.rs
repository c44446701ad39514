mod class;
mod env;
mod fun;
mod inter;
mod value;
mod visitor;

pub use class::{Class, Instance};
pub use env::Environment;
pub use fun::{Closure, Fun, NativeFun};
pub use inter::{Flow, Interpreter, MAX_CALL_DEPTH, STACK_SIZE};
pub use value::Value;

use crate::{ast::Stmt, LoxError};

/// Runs an already resolved program with a fresh interpreter writing to stdout.
pub fn interpret(stmts: &[Stmt]) -> Result<(), LoxError> {
    Interpreter::default().interpret(stmts)
}
