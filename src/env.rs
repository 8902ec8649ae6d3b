//! Lexically-scoped environment (spec.md §4.1 "Environment: Define, Update,
//! Get, Has"). Grounded on the parent-linked scope chain
//! `vtcode-core/src/config/context/` hands down per conversation turn, here
//! specialized to a single-threaded closure chain (`Rc<RefCell<_>>`, not
//! `Arc<Mutex<_>>`, since the evaluator itself is single-threaded).

use crate::eval::InterpError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// Cheap to clone: clones share the same chain of scopes, which is exactly
/// what closures need (spec.md §3: "closures capture the environment *by
/// reference* at declaration time").
#[derive(Clone)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
}

impl Environment {
    pub fn root() -> Self {
        Self {
            scope: Rc::new(RefCell::new(Scope {
                vars: HashMap::new(),
                parent: None,
            })),
        }
    }

    /// A new block scope nested under `self`. Used for `if`/`while` bodies
    /// and each iteration of a `for-of` loop, so a loop body's own `tool`
    /// declarations don't leak across iterations while the loop's own
    /// binding variable does (the loop frame itself is reused per
    /// iteration; only nested blocks inside it get a fresh child).
    pub fn child(&self) -> Self {
        Self {
            scope: Rc::new(RefCell::new(Scope {
                vars: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.scope.borrow_mut().vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, InterpError> {
        if let Some(v) = self.scope.borrow().vars.get(name) {
            return Ok(v.clone());
        }
        let parent = self.scope.borrow().parent.clone();
        match parent {
            Some(p) => p.get(name),
            None => Err(InterpError::name(format!("`{name}` is not defined"))),
        }
    }

    /// Bindings introduced directly in this frame, not walking parents.
    /// Used by `EvalString`/`Eval` to report the `Variables` a top-level
    /// script run introduced (spec.md §6).
    pub fn own_bindings(&self) -> HashMap<String, Value> {
        self.scope.borrow().vars.clone()
    }

    pub fn has(&self, name: &str) -> bool {
        if self.scope.borrow().vars.contains_key(name) {
            return true;
        }
        let parent = self.scope.borrow().parent.clone();
        match parent {
            Some(p) => p.has(name),
            None => false,
        }
    }

    /// Updates the nearest enclosing binding of `name`. Errors if no such
    /// binding exists (spec.md: assignment to an undeclared name is a name
    /// error, not an implicit global define).
    pub fn update(&self, name: &str, value: Value) -> Result<(), InterpError> {
        if self.scope.borrow().vars.contains_key(name) {
            self.scope.borrow_mut().vars.insert(name.to_string(), value);
            return Ok(());
        }
        let parent = self.scope.borrow().parent.clone();
        match parent {
            Some(p) => p.update(name, value),
            None => Err(InterpError::name(format!("`{name}` is not defined"))),
        }
    }
}
