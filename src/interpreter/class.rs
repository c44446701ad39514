use std::{cell::RefCell, fmt::{Debug, Display}, rc::Rc};

use fnv::FnvHashMap;

use crate::{errors, lexer::Token, LoxError};

use super::{Fun, Value};

#[derive(Clone)]
pub struct Class {
    name: String,
    methods: FnvHashMap<String, Fun>,
}

impl Class {
    pub fn new<S: Into<String>>(name: S, methods: FnvHashMap<String, Fun>) -> Self {
        Self { name: name.into(), methods }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<&Fun> {
        self.methods.get(name)
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.name)
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<class {}>", &self.name)
    }
}

/// An object created by calling a class. Clones share the same fields.
#[derive(Clone)]
pub struct Instance {
    class: Rc<Class>,
    fields: Rc<RefCell<FnvHashMap<String, Value>>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self { class, fields: Default::default() }
    }

    /// Reads a field, falling back to a method bound to this instance.
    pub fn get(&self, property: &Token) -> Result<Value, LoxError> {
        if let Some(value) = self.fields.borrow().get(property.lexeme()) {
            return Ok(value.clone());
        }

        match self.class.find_method(property.lexeme()) {
            Some(method) => Ok(Value::Function(method.bind(self.clone()))),
            None => Err(errors::runtime(
                property.location(),
                format!("Undefined property '{}'.", property.lexeme()),
                format!("Assign a value to `{}` on this {} instance before reading it.", property.lexeme(), self.class.name()),
            )),
        }
    }

    pub fn set(&self, property: &Token, value: Value) {
        self.fields.borrow_mut().insert(property.lexeme().to_string(), value);
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} instance", self.class.name())
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<{} instance>", self.class.name())
    }
}
