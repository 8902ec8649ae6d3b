//! Property descriptors — the core innovation named in spec.md §3.
//!
//! Grounded on `vtcode-config`'s layered `ModelConfig`/`AgentConfig` structs,
//! generalized to the descriptor shape spec.md calls for: a stored value
//! plus optional getter/setter closures and a read-only flag, unified behind
//! one type instead of per-property proxy types (spec.md §9).

use super::{TypeTag, Value};
use crate::eval::InterpError;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A zero-argument getter or single-argument setter, or a native tool body.
/// `Rc` so descriptors can be cheaply cloned while sharing the same closure
/// identity (needed so `DeepCopy` can "preserve `Getter`/`Setter` references"
/// per spec.md §3).
pub type NativeFn = Rc<dyn Fn(Vec<Value>) -> Result<Value, InterpError>>;

#[derive(Clone)]
pub struct Descriptor {
    pub value: Value,
    pub read_only: bool,
    pub getter: Option<NativeFn>,
    pub setter: Option<NativeFn>,
}

impl Descriptor {
    pub fn plain(value: Value) -> Self {
        Self {
            value,
            read_only: false,
            getter: None,
            setter: None,
        }
    }

    pub fn read_only(value: Value) -> Self {
        Self {
            value,
            read_only: true,
            getter: None,
            setter: None,
        }
    }

    pub fn with_getter(getter: NativeFn) -> Self {
        Self {
            value: Value::Null,
            read_only: false,
            getter: Some(getter),
            setter: None,
        }
    }

    pub fn getter_setter(getter: NativeFn, setter: NativeFn) -> Self {
        Self {
            value: Value::Null,
            read_only: false,
            getter: Some(getter),
            setter: Some(setter),
        }
    }

    pub fn read_only_getter(getter: NativeFn) -> Self {
        Self {
            value: Value::Null,
            read_only: true,
            getter: Some(getter),
            setter: None,
        }
    }

    /// Read: getter takes precedence over the stored value.
    pub fn read(&self) -> Result<Value, InterpError> {
        if let Some(getter) = &self.getter {
            getter(vec![])
        } else {
            Ok(self.value.clone())
        }
    }

    /// Write: read-only fails; else delegate to setter; else set the value.
    pub fn write(&mut self, new_value: Value) -> Result<(), InterpError> {
        if self.read_only {
            return Err(InterpError::domain("assignment to read-only property"));
        }
        if let Some(setter) = &self.setter {
            setter(vec![new_value])?;
            Ok(())
        } else {
            self.value = new_value;
            Ok(())
        }
    }
}

/// An object's property map: an ordered `name -> Descriptor` table.
/// Ordered so iteration (e.g. `for (v of obj)` over an object's values, or
/// debug rendering) is deterministic and matches declaration order.
#[derive(Default, Clone)]
pub struct ObjectValue {
    order: Vec<String>,
    descriptors: BTreeMap<String, Descriptor>,
}

impl ObjectValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, key: impl Into<String>, descriptor: Descriptor) {
        let key = key.into();
        if !self.descriptors.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.descriptors.insert(key, descriptor);
    }

    pub fn set_plain(&mut self, key: impl Into<String>, value: Value) {
        self.define(key, Descriptor::plain(value));
    }

    /// Reads as `null` when the key is missing (spec.md §3 invariant).
    pub fn get(&self, key: &str) -> Result<Value, InterpError> {
        match self.descriptors.get(key) {
            Some(d) => d.read(),
            None => Ok(Value::Null),
        }
    }

    pub fn descriptor(&self, key: &str) -> Option<&Descriptor> {
        self.descriptors.get(key)
    }

    pub fn descriptor_mut(&mut self, key: &str) -> Option<&mut Descriptor> {
        self.descriptors.get_mut(key)
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<(), InterpError> {
        match self.descriptors.get_mut(key) {
            Some(d) => d.write(value),
            None => {
                self.define(key, Descriptor::plain(value));
                Ok(())
            }
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `DeepCopy`: clone the descriptor map, recursively deep-copying
    /// compound `value` fields, preserving `read_only`/`getter`/`setter`
    /// (the closures themselves are considered immutable) — spec.md §3.
    pub fn deep_copy(&self) -> Self {
        let mut out = ObjectValue::new();
        for key in &self.order {
            let d = &self.descriptors[key];
            out.define(
                key.clone(),
                Descriptor {
                    value: d.value.deep_copy(),
                    read_only: d.read_only,
                    getter: d.getter.clone(),
                    setter: d.setter.clone(),
                },
            );
        }
        out
    }

    /// `DeepMerge(base, override)`: independent new object; keys present in
    /// both whose values are both objects merge recursively, else the
    /// override replaces the base; descriptor metadata comes from the
    /// override (spec.md §3).
    pub fn deep_merge(base: &ObjectValue, over: &ObjectValue) -> ObjectValue {
        let mut out = base.deep_copy();
        for key in &over.order {
            let over_d = &over.descriptors[key];
            let merged_value = match (base.descriptor(key), &over_d.value) {
                (Some(base_d), Value::Object(over_obj)) => {
                    if let Value::Object(base_obj) = &base_d.value {
                        Value::object(ObjectValue::deep_merge(
                            &base_obj.borrow(),
                            &over_obj.borrow(),
                        ))
                    } else {
                        over_d.value.deep_copy()
                    }
                }
                _ => over_d.value.deep_copy(),
            };
            out.define(
                key.clone(),
                Descriptor {
                    value: merged_value,
                    read_only: over_d.read_only,
                    getter: over_d.getter.clone(),
                    setter: over_d.setter.clone(),
                },
            );
        }
        out
    }
}

pub(crate) fn type_mismatch(expected: TypeTag, actual: &Value) -> InterpError {
    InterpError::type_error(format!(
        "expected {:?}, got {:?}",
        expected,
        actual.type_tag()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_write_fails_and_leaves_object_unchanged() {
        let mut obj = ObjectValue::new();
        obj.define("version", Descriptor::read_only(Value::string("1.0")));
        let before = obj.get("version").unwrap();
        let err = obj.set("version", Value::string("2.0"));
        assert!(err.is_err());
        let after = obj.get("version").unwrap();
        assert!(before.eq_value(&after));
    }

    #[test]
    fn missing_key_reads_null() {
        let obj = ObjectValue::new();
        assert!(matches!(obj.get("nope").unwrap(), Value::Null));
    }

    #[test]
    fn deep_copy_shares_no_mutable_substructure() {
        let mut inner = ObjectValue::new();
        inner.set_plain("x", Value::Number(1.0));
        let mut outer = ObjectValue::new();
        outer.set_plain("inner", Value::object(inner));

        let copy = outer.deep_copy();
        if let Value::Object(inner_copy) = copy.get("inner").unwrap() {
            inner_copy.borrow_mut().set_plain("x", Value::Number(2.0));
        }
        if let Value::Object(original_inner) = outer.get("inner").unwrap() {
            assert_eq!(
                matches!(original_inner.borrow().get("x").unwrap(), Value::Number(n) if n == 1.0),
                true
            );
        }
    }

    #[test]
    fn deep_merge_idempotent_on_empty_override() {
        let mut base = ObjectValue::new();
        base.set_plain("a", Value::Number(1.0));
        let over = ObjectValue::new();
        let merged = ObjectValue::deep_merge(&base, &over);
        assert_eq!(merged.len(), base.len());
    }

    #[test]
    fn deep_merge_recurses_into_nested_objects() {
        let mut base_inner = ObjectValue::new();
        base_inner.set_plain("a", Value::Number(1.0));
        base_inner.set_plain("b", Value::Number(2.0));
        let mut base = ObjectValue::new();
        base.set_plain("inner", Value::object(base_inner));

        let mut over_inner = ObjectValue::new();
        over_inner.set_plain("b", Value::Number(20.0));
        let mut over = ObjectValue::new();
        over.set_plain("inner", Value::object(over_inner));

        let merged = ObjectValue::deep_merge(&base, &over);
        if let Value::Object(inner) = merged.get("inner").unwrap() {
            let inner = inner.borrow();
            assert!(matches!(inner.get("a").unwrap(), Value::Number(n) if n == 1.0));
            assert!(matches!(inner.get("b").unwrap(), Value::Number(n) if n == 20.0));
        } else {
            panic!("expected merged inner object");
        }
    }
}
