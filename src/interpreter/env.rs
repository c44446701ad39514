use std::{cell::RefCell, rc::Rc};

use fnv::FnvHashMap;

use crate::{errors, lexer::Token, LoxError};

use super::Value;

/// A handle to one frame of the runtime environment. Cloning the handle shares
/// the frame, which is how closures keep the frames they capture alive.
#[derive(Clone, Debug, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Debug, Clone)]
enum Slot {
    Uninitialized,
    Initialized(Value),
}

#[derive(Debug, Default)]
struct Scope {
    slots: Vec<Slot>,
    /// Name-addressed bindings point into `slots`, so both lookups share storage.
    names: FnvHashMap<String, usize>,
    parent: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_of(parent: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            parent: Some(parent.clone()),
            ..Default::default()
        })))
    }

    pub fn branch(&self) -> Self {
        Self::child_of(self)
    }

    /// Appends a new slot to this frame, returning its index.
    pub fn declare_slot(&self, value: Option<Value>) -> usize {
        let mut scope = self.0.borrow_mut();
        scope.slots.push(value.map(Slot::Initialized).unwrap_or(Slot::Uninitialized));
        scope.slots.len() - 1
    }

    /// Appends a new slot which can also be looked up by `name`.
    pub fn declare_named<K: Into<String>>(&self, name: K, value: Option<Value>) -> usize {
        let slot = self.declare_slot(value);
        self.alias_named(name, slot);
        slot
    }

    /// Makes `name` refer to an existing slot of this frame.
    pub fn alias_named<K: Into<String>>(&self, name: K, slot: usize) {
        self.0.borrow_mut().names.insert(name.into(), slot);
    }

    /// Pads this frame with uninitialized slots until it holds at least `count`.
    pub fn ensure_slots(&self, count: usize) {
        let mut scope = self.0.borrow_mut();
        if scope.slots.len() < count {
            scope.slots.resize(count, Slot::Uninitialized);
        }
    }

    pub fn slot_count(&self) -> usize {
        self.0.borrow().slots.len()
    }

    pub fn read_at(&self, depth: usize, slot: usize, name: &Token) -> Result<Value, LoxError> {
        let frame = self.ancestor(depth, name)?;
        let scope = frame.0.borrow();

        match scope.slots.get(slot) {
            Some(Slot::Initialized(value)) => Ok(value.clone()),
            Some(Slot::Uninitialized) => Err(errors::runtime(
                name.location(),
                format!("Variable '{}' referenced before assignment.", name.lexeme()),
                format!("Assign a value to '{}' before you read it, for example `var {} = nil;`.", name.lexeme(), name.lexeme()),
            )),
            None => Err(Self::desync(depth, slot, name)),
        }
    }

    pub fn write_at(&self, depth: usize, slot: usize, name: &Token, value: Value) -> Result<(), LoxError> {
        let frame = self.ancestor(depth, name)?;
        let mut scope = frame.0.borrow_mut();

        match scope.slots.get_mut(slot) {
            Some(target) => {
                *target = Slot::Initialized(value);
                Ok(())
            },
            None => Err(Self::desync(depth, slot, name)),
        }
    }

    pub fn read_named(&self, name: &Token) -> Result<Value, LoxError> {
        match self.find_named(name.lexeme()) {
            Some((frame, slot)) => frame.read_at(0, slot, name),
            None => Err(Self::undefined(name)),
        }
    }

    pub fn assign_named(&self, name: &Token, value: Value) -> Result<(), LoxError> {
        match self.find_named(name.lexeme()) {
            Some((frame, slot)) => frame.write_at(0, slot, name, value),
            None => Err(Self::undefined(name)),
        }
    }

    fn find_named(&self, key: &str) -> Option<(Environment, usize)> {
        let mut frame = self.clone();
        loop {
            let (slot, parent) = {
                let scope = frame.0.borrow();
                (scope.names.get(key).copied(), scope.parent.clone())
            };

            if let Some(slot) = slot {
                return Some((frame, slot));
            }

            frame = parent?;
        }
    }

    fn ancestor(&self, depth: usize, name: &Token) -> Result<Environment, LoxError> {
        let mut frame = self.clone();
        for _ in 0..depth {
            let parent = frame.0.borrow().parent.clone();
            frame = parent.ok_or_else(|| errors::system(
                format!("The environment chain ended before reaching the frame which holds '{}' ({} frames up).", name.lexeme(), depth),
                "This is a bug in the interpreter, please report it with example code.",
            ))?;
        }

        Ok(frame)
    }

    fn desync(depth: usize, slot: usize, name: &Token) -> LoxError {
        errors::system(
            format!("No slot {} exists in the frame {} levels above the reference to '{}' at {}.", slot, depth, name.lexeme(), name.location()),
            "This is a bug in the interpreter, please report it with example code.",
        )
    }

    fn undefined(name: &Token) -> LoxError {
        errors::runtime(
            name.location(),
            format!("Undefined variable '{}'.", name.lexeme()),
            format!("Define the variable before you use it, for example `var {} = nil;`.", name.lexeme()),
        )
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
