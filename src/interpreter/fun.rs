use std::{fmt::{Debug, Display}, rc::Rc};

use tracing::instrument;

use crate::{ast::FunDecl, LoxError};

use super::{env::Environment, Flow, Instance, Interpreter, Value};

#[derive(Clone)]
pub enum Fun {
    Native(Rc<NativeFun>),
    Closure(Closure),
}

impl Fun {
    pub fn native<T: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, LoxError> + 'static, S: Into<String>>(name: S, arity: usize, fun: T) -> Self {
        Fun::Native(Rc::new(NativeFun::new(name, arity, fun)))
    }

    pub fn closure(decl: Rc<FunDecl>, env: Environment) -> Self {
        Fun::Closure(Closure::new(decl, env))
    }

    pub fn name(&self) -> &str {
        match self {
            Fun::Native(fun) => fun.name(),
            Fun::Closure(closure) => closure.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Fun::Native(fun) => fun.arity(),
            Fun::Closure(closure) => closure.arity(),
        }
    }

    #[instrument(level = "trace", skip_all, fields(function = self.name(), args = args.len()))]
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, LoxError> {
        match self {
            Fun::Native(fun) => fun.call(interpreter, args),
            Fun::Closure(closure) => closure.call(interpreter, args),
        }
    }

    pub fn bind(&self, this: Instance) -> Self {
        match self {
            Fun::Native(fun) => Fun::Native(fun.clone()),
            Fun::Closure(closure) => Fun::Closure(closure.bind(this)),
        }
    }
}

impl Display for Fun {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Fun::Native(_) => write!(f, "<native fn>"),
            Fun::Closure(closure) => write!(f, "<fn {}>", closure.name()),
        }
    }
}

impl Debug for Fun {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl PartialEq for Fun {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Fun::Native(fun1), Fun::Native(fun2)) => Rc::ptr_eq(fun1, fun2),
            (Fun::Closure(closure1), Fun::Closure(closure2)) => closure1 == closure2,
            _ => false,
        }
    }
}

pub struct NativeFun {
    pub name: String,
    pub arity: usize,
    #[allow(clippy::type_complexity)]
    pub fun: Box<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, LoxError>>,
}

impl NativeFun {
    pub fn new<T: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, LoxError> + 'static, S: Into<String>>(name: S, arity: usize, fun: T) -> Self {
        Self { name: name.into(), arity, fun: Box::new(fun) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, LoxError> {
        (self.fun)(interpreter, args)
    }
}

/// A function declaration paired with the frame it was created in.
#[derive(Clone)]
pub struct Closure {
    decl: Rc<FunDecl>,
    closure: Environment,
}

impl Closure {
    pub fn new(decl: Rc<FunDecl>, closure: Environment) -> Self {
        Self { decl, closure }
    }

    pub fn name(&self) -> &str {
        self.decl.name()
    }

    pub fn arity(&self) -> usize {
        self.decl.arity()
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, LoxError> {
        let env = self.closure.branch();
        for value in args {
            env.declare_slot(Some(value));
        }

        match interpreter.execute_block(&self.decl.body, env) {
            Ok(()) => Ok(Value::Nil),
            Err(Flow::Return(value)) => Ok(value),
            Err(Flow::Break) | Err(Flow::Continue) => Ok(Value::Nil),
            Err(Flow::Error(err)) => Err(err),
        }
    }

    /// Wraps this method in a frame whose first slot holds `this`.
    pub fn bind(&self, this: Instance) -> Self {
        let closure = self.closure.branch();
        closure.declare_slot(Some(Value::Instance(this)));

        Self::new(self.decl.clone(), closure)
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.decl, &other.decl) && self.closure == other.closure
    }
}
