use std::io::Write;

use tracing::debug;

use crate::{ast::{Stmt, StmtVisitor}, errors, LoxError, Loc};

use super::{env::Environment, Fun, Value};

/// Calls nested deeper than this abort the program with a runtime error,
/// unless the interpreter is configured with [`Interpreter::with_max_depth`].
pub const MAX_CALL_DEPTH: usize = 1000;

/// The stack size needed by a thread that runs the interpreter with the
/// default call depth.
pub const STACK_SIZE: usize = 64 * 1024 * 1024;

/// The ways in which executing a statement can leave its enclosing block early.
#[derive(Debug)]
pub enum Flow {
    Error(LoxError),
    Return(Value),
    Break,
    Continue,
}

impl From<LoxError> for Flow {
    fn from(err: LoxError) -> Self {
        Flow::Error(err)
    }
}

pub struct Interpreter {
    pub(super) natives: Environment,
    pub(super) globals: Environment,
    pub(super) env: Environment,
    pub(super) depth: usize,
    pub(super) max_depth: usize,
    pub output: Box<dyn Write>,
}

impl Interpreter {
    /// Executes `stmts`, which must already have been resolved, stopping at the
    /// first runtime error.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), LoxError> {
        debug!(statements = stmts.len(), globals = self.globals.slot_count(), "interpreting program");

        let globals = self.globals.clone();
        let result = self.scoped(globals, |interpreter: &mut Self| -> Result<(), Flow> {
            for stmt in stmts {
                interpreter.visit_stmt(stmt)?;
            }

            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(Flow::Error(err)) => Err(err),
            Err(Flow::Return(_)) => Err(errors::system(
                "A return statement escaped from the top level of the program.",
                "This is a bug in the interpreter, please report it with example code.",
            )),
            Err(Flow::Break) | Err(Flow::Continue) => Err(errors::system(
                "A loop control statement escaped from the top level of the program.",
                "This is a bug in the interpreter, please report it with example code.",
            )),
        }
    }

    pub fn with_output(self, output: Box<dyn Write>) -> Self {
        Self {
            output,
            ..self
        }
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self {
            max_depth,
            ..self
        }
    }

    /// Makes a native function available to every program by name.
    pub fn define_native(&mut self, fun: Fun) {
        self.natives.declare_named(fun.name().to_string(), Some(Value::Function(fun)));
    }

    /// Pads the global frame so that its slots line up with the resolver's
    /// view of the program, after a previous run stopped part way through.
    pub fn ensure_global_slots(&mut self, count: usize) {
        self.globals.ensure_slots(count);
    }

    /// Runs `stmts` in `env`, which is usually a fresh child of the current frame.
    pub fn execute_block(&mut self, stmts: &[Stmt], env: Environment) -> Result<(), Flow> {
        self.scoped(env, |interpreter: &mut Self| -> Result<(), Flow> {
            for stmt in stmts {
                interpreter.visit_stmt(stmt)?;
            }

            Ok(())
        })
    }

    /// Swaps `env` in as the current frame for the duration of `f`.
    pub(super) fn scoped<T, F: FnOnce(&mut Self) -> T>(&mut self, env: Environment, f: F) -> T {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        let natives = Environment::new();
        let globals = natives.branch();

        let mut interpreter = Self {
            env: globals.clone(),
            natives,
            globals,
            depth: 0,
            max_depth: MAX_CALL_DEPTH,
            output: Box::new(std::io::stdout()),
        };

        interpreter.define_native(Fun::native("clock", 0, |_, _| {
            let offset = std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH)
                .map_err(|_| errors::runtime(
                    Loc::Native,
                    "Failed to get current system time because the system time is currently set to a time earlier than 1970-01-01T00:00:00Z.",
                    "Make sure that you have set your system clock correctly."))?;

            Ok(Value::Number(offset.as_secs_f64()))
        }));

        interpreter
    }
}
