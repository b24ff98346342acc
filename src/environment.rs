use crate::types::Value;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Unknown variable \"{0}\"")]
    Unbound(String),
    #[error("Variable \"{0}\" is already defined in this scope")]
    AlreadyDefined(String),
}

impl EnvError {
    /// The offending symbol.
    pub fn symbol(&self) -> &str {
        match self {
            EnvError::Unbound(name) | EnvError::AlreadyDefined(name) => name,
        }
    }
}

// --- Environment Definition ---

/// One lexical frame plus a link to the enclosing frame.
///
/// Frames are shared through `Rc<RefCell<...>>`: every closure and call
/// frame that encloses a frame sees `define` and `set!` on it. Parent links
/// only ever point outward.
#[derive(Debug, Default)]
pub struct Environment {
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Value>,
}

/// A copy of one frame's bindings, taken before evaluating a REPL input.
#[derive(Debug, Clone)]
pub struct Snapshot(HashMap<String, Value>);

impl Environment {
    /// Creates a new, empty top-level (global) environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Builds a frame from name/value pairs. Fails on a repeated name; the
    /// half-built frame is dropped before anything can reference it.
    pub fn with_bindings<I>(
        bindings: I,
        outer: Option<Rc<RefCell<Environment>>>,
    ) -> Result<Rc<RefCell<Self>>, EnvError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut env = Environment {
            outer,
            bindings: HashMap::new(),
        };
        for (name, value) in bindings {
            env.define(&name, value)?;
        }
        Ok(Rc::new(RefCell::new(env)))
    }

    /// Defines a variable in the *current* frame.
    /// A name may only be defined once per frame.
    pub fn define(&mut self, name: &str, value: Value) -> Result<(), EnvError> {
        match self.bindings.entry(name.to_string()) {
            Entry::Occupied(_) => Err(EnvError::AlreadyDefined(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Binds `name` in the current frame, replacing any existing binding there.
    pub(crate) fn bind(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    /// Looks up a variable's value.
    /// Checks the current frame first, then walks up the outer chain.
    pub fn lookup(&self, name: &str) -> Result<Value, EnvError> {
        if let Some(value) = self.bindings.get(name) {
            Ok(value.clone())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().lookup(name),
                None => Err(EnvError::Unbound(name.to_string())),
            }
        }
    }

    /// Sets the value of an *existing* variable in the environment chain.
    /// Updates the nearest frame where the variable is found; never creates one.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), EnvError> {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = value;
            Ok(())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow_mut().set(name, value),
                None => Err(EnvError::Unbound(name.to_string())),
            }
        }
    }

    /// Copies the bindings of this frame only.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.bindings.clone())
    }

    /// Replaces the bindings of this frame with a previous snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.bindings = snapshot.0;
    }

    fn add_identifiers(&self, mut identifiers: HashSet<String>) -> HashSet<String> {
        identifiers.extend(self.bindings.keys().cloned());
        match self.outer {
            Some(ref outer_env_ptr) => outer_env_ptr.borrow().add_identifiers(identifiers),
            None => identifiers,
        }
    }

    /// Gets every identifier visible from this frame.
    pub fn get_identifiers(&self) -> HashSet<String> {
        self.add_identifiers(HashSet::new())
    }
}
