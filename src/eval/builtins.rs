//! Built-in method dispatch for primitive/compound values reached through
//! method-call syntax (`"x".toUpperCase()`, `arr.push(1)`, `map.has(k)`),
//! as opposed to the descriptor-backed `gsh.*` bridge objects which go
//! through `ObjectValue` directly (spec.md §4.7).

use super::error::InterpError;
use crate::value::{MapKey, OrderedMap, OrderedSet, Value};
use crate::{regex_cache, strings};
use std::cell::RefCell;
use std::rc::Rc;

pub fn call_string_method(s: &str, method: &str, args: &[Value]) -> Result<Value, InterpError> {
    let arg_str = |i: usize| -> Result<String, InterpError> {
        args.get(i)
            .map(|v| v.to_display_string())
            .ok_or_else(|| InterpError::arity(i + 1, args.len()))
    };
    let arg_num = |i: usize| -> Result<i64, InterpError> {
        match args.get(i) {
            Some(Value::Number(n)) => Ok(*n as i64),
            _ => Err(InterpError::type_error(format!("argument {i} must be a number"))),
        }
    };

    Ok(match method {
        "toUpperCase" => Value::string(strings::to_upper_case(s)),
        "toLowerCase" => Value::string(strings::to_lower_case(s)),
        "trim" => Value::string(strings::trim(s)),
        "trimStart" => Value::string(strings::trim_start(s)),
        "trimEnd" => Value::string(strings::trim_end(s)),
        "split" => Value::array(
            strings::split(s, &arg_str(0)?)
                .into_iter()
                .map(Value::string)
                .collect(),
        ),
        "indexOf" => Value::Number(strings::index_of(s, &arg_str(0)?) as f64),
        "lastIndexOf" => Value::Number(strings::last_index_of(s, &arg_str(0)?) as f64),
        "substring" => {
            let end = match args.get(1) {
                Some(Value::Number(n)) => Some(*n as i64),
                _ => None,
            };
            Value::string(strings::substring(s, arg_num(0)?, end)?)
        }
        "slice" => {
            let end = match args.get(1) {
                Some(Value::Number(n)) => Some(*n as i64),
                _ => None,
            };
            Value::string(strings::slice(s, arg_num(0)?, end)?)
        }
        "startsWith" => Value::Bool(strings::starts_with(s, &arg_str(0)?)),
        "endsWith" => Value::Bool(strings::ends_with(s, &arg_str(0)?)),
        "includes" => Value::Bool(strings::includes(s, &arg_str(0)?)),
        "replace" => Value::string(strings::replace(s, &arg_str(0)?, &arg_str(1)?)),
        "replaceAll" => Value::string(strings::replace_all(s, &arg_str(0)?, &arg_str(1)?)),
        "repeat" => Value::string(strings::repeat(s, arg_num(0)?)?),
        "padStart" => Value::string(strings::pad_start(s, arg_num(0)?, &arg_str(1)?)),
        "padEnd" => Value::string(strings::pad_end(s, arg_num(0)?, &arg_str(1)?)),
        "charAt" => Value::string(strings::char_at(s, arg_num(0)?)?),
        "length" => Value::Number(s.chars().count() as f64),
        other => return Err(InterpError::name(format!("no string method `{other}`"))),
    })
}

pub fn call_array_method(
    array: &Rc<RefCell<Vec<Value>>>,
    method: &str,
    args: &[Value],
) -> Result<Value, InterpError> {
    Ok(match method {
        "push" => {
            array.borrow_mut().extend_from_slice(args);
            Value::Number(array.borrow().len() as f64)
        }
        "pop" => array.borrow_mut().pop().unwrap_or(Value::Null),
        "length" => Value::Number(array.borrow().len() as f64),
        "includes" => {
            let needle = args.first().ok_or_else(|| InterpError::arity(1, 0))?;
            Value::Bool(array.borrow().iter().any(|v| v.eq_value(needle)))
        }
        "indexOf" => {
            let needle = args.first().ok_or_else(|| InterpError::arity(1, 0))?;
            Value::Number(
                array
                    .borrow()
                    .iter()
                    .position(|v| v.eq_value(needle))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            )
        }
        "join" => {
            let sep = args.first().map(|v| v.to_display_string()).unwrap_or_else(|| ",".into());
            Value::string(
                array
                    .borrow()
                    .iter()
                    .map(Value::to_display_string)
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        "slice" => {
            let items = array.borrow();
            let len = items.len() as i64;
            let start = args
                .first()
                .and_then(|v| if let Value::Number(n) = v { Some(*n as i64) } else { None })
                .unwrap_or(0)
                .clamp(0, len) as usize;
            let end = args
                .get(1)
                .and_then(|v| if let Value::Number(n) = v { Some(*n as i64) } else { None })
                .unwrap_or(len)
                .clamp(0, len) as usize;
            Value::array(if start < end { items[start..end].to_vec() } else { vec![] })
        }
        other => return Err(InterpError::name(format!("no array method `{other}`"))),
    })
}

pub fn call_map_method(
    map: &Rc<RefCell<OrderedMap>>,
    method: &str,
    args: &[Value],
) -> Result<Value, InterpError> {
    let key_of = |v: &Value| -> Result<MapKey, InterpError> {
        MapKey::from_value(v).ok_or_else(|| InterpError::domain("map keys must be string/number/bool"))
    };
    Ok(match method {
        "get" => {
            let key = key_of(args.first().ok_or_else(|| InterpError::arity(1, 0))?)?;
            map.borrow().get(&key).cloned().unwrap_or(Value::Null)
        }
        "set" => {
            let key = key_of(args.first().ok_or_else(|| InterpError::arity(2, args.len()))?)?;
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            map.borrow_mut().insert(key, value);
            Value::Map(map.clone())
        }
        "has" => {
            let key = key_of(args.first().ok_or_else(|| InterpError::arity(1, 0))?)?;
            Value::Bool(map.borrow().get(&key).is_some())
        }
        "delete" => {
            let key = key_of(args.first().ok_or_else(|| InterpError::arity(1, 0))?)?;
            Value::Bool(map.borrow_mut().remove(&key))
        }
        "size" => Value::Number(map.borrow().len() as f64),
        "keys" => Value::array(map.borrow().keys_in_order().map(MapKey::to_value).collect()),
        "values" => Value::array(
            map.borrow()
                .keys_in_order()
                .filter_map(|k| map.borrow().get(k).cloned())
                .collect(),
        ),
        "entries" => Value::array(
            map.borrow()
                .keys_in_order()
                .filter_map(|k| map.borrow().get(k).cloned().map(|v| (k.clone(), v)))
                .map(|(k, v)| Value::array(vec![MapKey::to_value(&k), v]))
                .collect(),
        ),
        other => return Err(InterpError::name(format!("no map method `{other}`"))),
    })
}

pub fn call_set_method(
    set: &Rc<RefCell<OrderedSet>>,
    method: &str,
    args: &[Value],
) -> Result<Value, InterpError> {
    Ok(match method {
        "add" => {
            let value = args.first().cloned().ok_or_else(|| InterpError::arity(1, 0))?;
            set.borrow_mut().add(value);
            Value::Set(set.clone())
        }
        "has" => {
            let value = args.first().ok_or_else(|| InterpError::arity(1, 0))?;
            Value::Bool(set.borrow().has(value))
        }
        "delete" => {
            let value = args.first().ok_or_else(|| InterpError::arity(1, 0))?;
            Value::Bool(set.borrow_mut().remove(value))
        }
        "size" => Value::Number(set.borrow().len() as f64),
        "values" => Value::array(set.borrow().values().to_vec()),
        other => return Err(InterpError::name(format!("no set method `{other}`"))),
    })
}

/// `Regexp.*` static built-ins (spec.md §4.7/§4.10), invoked as
/// `Regexp.test(s, pat)` etc. through the global `Regexp` object — argument
/// order matches spec.md §4.10's `(s, pat, ...)` throughout.
pub fn call_regexp_static(
    cache: &regex_cache::RegexCache,
    method: &str,
    args: &[Value],
) -> Result<Value, InterpError> {
    let arg_str = |i: usize| -> Result<String, InterpError> {
        match args.get(i) {
            Some(v) => Ok(v.to_display_string()),
            None => Err(InterpError::arity(i + 1, args.len())),
        }
    };
    let arg_limit = |i: usize| -> Option<usize> {
        match args.get(i) {
            Some(Value::Number(n)) => Some(*n as usize),
            _ => None,
        }
    };
    Ok(match method {
        "test" => Value::Bool(regex_cache::test(cache, &arg_str(0)?, &arg_str(1)?)?),
        "match" => match regex_cache::find_match(cache, &arg_str(0)?, &arg_str(1)?)? {
            Some(groups) => Value::array(
                groups
                    .into_iter()
                    .map(|g| g.map(Value::string).unwrap_or(Value::Null))
                    .collect(),
            ),
            None => Value::Null,
        },
        "findAll" => Value::array(
            regex_cache::find_all(cache, &arg_str(0)?, &arg_str(1)?, arg_limit(2))?
                .into_iter()
                .map(Value::string)
                .collect(),
        ),
        "replace" => Value::string(regex_cache::replace(cache, &arg_str(0)?, &arg_str(1)?, &arg_str(2)?)?),
        "replaceAll" => Value::string(regex_cache::replace_all(cache, &arg_str(0)?, &arg_str(1)?, &arg_str(2)?)?),
        "split" => Value::array(
            regex_cache::split(cache, &arg_str(0)?, &arg_str(1)?, arg_limit(2))?
                .into_iter()
                .map(Value::string)
                .collect(),
        ),
        "escape" => Value::string(regex_cache::escape(&arg_str(0)?)),
        other => return Err(InterpError::name(format!("no Regexp method `{other}`"))),
    })
}
