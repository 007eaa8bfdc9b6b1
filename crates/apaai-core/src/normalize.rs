//! Normalization of caller input into canonical wire shapes.
//!
//! Callers may hand the client either typed values or open JSON mappings.
//! The functions here turn both into the same canonical form, so the rest of
//! the core never has to care which representation it was given.
//!
//! All functions are pure apart from `now_iso` and `new_action_id`, which
//! supply the defaults `propose` uses for `timestamp` and `id`.

use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use apaai_contracts::{
    Actor, ActorInput, ApaaiError, ApaaiResult, Check, CheckInput, Policy, PolicyInput, Repr,
};

/// Convert a typed value or an open mapping into a plain JSON mapping.
///
/// An open mapping that reads as `T` is written back the way the typed value
/// would be, so both representations give identical JSON (an explicit
/// `"provider": null` on an actor is dropped, as a typed `None` is). Unknown
/// fields pass through either way. A mapping that does not read as `T` is
/// returned untouched. Fails with `Validation` when the input is not a
/// mapping.
pub fn to_jsonable<T>(input: &Repr<T>) -> ApaaiResult<Map<String, Value>>
where
    T: Serialize + DeserializeOwned,
{
    match input {
        Repr::Typed(value) => typed_to_map(value),
        Repr::Open(value) => {
            let map = expect_object(value.clone(), "input")?;
            match serde_json::from_value::<T>(Value::Object(map.clone())) {
                Ok(typed) => typed_to_map(&typed),
                Err(_) => Ok(map),
            }
        }
    }
}

fn typed_to_map<T: Serialize>(value: &T) -> ApaaiResult<Map<String, Value>> {
    let json = serde_json::to_value(value)
        .map_err(|e| ApaaiError::validation(format!("value cannot be represented as JSON: {e}")))?;
    expect_object(json, "typed value")
}

/// Require `value` to be a JSON object.
pub fn expect_object(value: Value, what: &str) -> ApaaiResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApaaiError::validation(format!(
            "{what} must be a mapping, got {}",
            json_kind(&other)
        ))),
    }
}

/// Normalize an actor given in either representation.
pub fn normalize_actor(input: &ActorInput) -> ApaaiResult<Actor> {
    decode(to_jsonable(input)?, "actor")
}

/// Normalize a policy given in either representation.
pub fn normalize_policy(input: &PolicyInput) -> ApaaiResult<Policy> {
    decode(to_jsonable(input)?, "policy")
}

/// Normalize a sequence of checks into canonical `{name, pass, note?}` form.
///
/// Order and count are preserved exactly: no sorting, no deduplication.
/// Fails with `Validation` on the first element that lacks a non-empty
/// `name`, lacks `pass`, or whose `pass` cannot be read as a boolean.
pub fn normalize_checks<I>(checks: I) -> ApaaiResult<Vec<Check>>
where
    I: IntoIterator,
    I::Item: Into<CheckInput>,
{
    checks
        .into_iter()
        .enumerate()
        .map(|(index, check)| normalize_check(index, check.into()))
        .collect()
}

fn normalize_check(index: usize, input: CheckInput) -> ApaaiResult<Check> {
    let map = match input {
        Repr::Typed(check) => {
            if check.name.is_empty() {
                return Err(ApaaiError::validation(format!(
                    "check at index {index} has an empty 'name'"
                )));
            }
            return Ok(check);
        }
        Repr::Open(Value::Object(map)) => map,
        Repr::Open(other) => {
            return Err(ApaaiError::validation(format!(
                "check at index {index} must be a mapping, got {}",
                json_kind(&other)
            )))
        }
    };

    let name = match map.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        Some(Value::String(_)) => {
            return Err(ApaaiError::validation(format!(
                "check at index {index} has an empty 'name'"
            )))
        }
        Some(other) => {
            return Err(ApaaiError::validation(format!(
                "check at index {index} has a non-string 'name' ({})",
                json_kind(other)
            )))
        }
        None => {
            return Err(ApaaiError::validation(format!(
                "check at index {index} is missing 'name'"
            )))
        }
    };

    let pass = match map.get("pass") {
        Some(value) => coerce_bool(value).ok_or_else(|| {
            ApaaiError::validation(format!(
                "check '{name}' has a 'pass' value that is not boolean: {value}"
            ))
        })?,
        None => {
            return Err(ApaaiError::validation(format!(
                "check '{name}' is missing 'pass'"
            )))
        }
    };

    Ok(Check {
        note: optional_string(&map, "note", &name)?,
        approver: optional_string(&map, "approver", &name)?,
        name,
        pass,
    })
}

/// Accepts JSON booleans, `0`/`1`, and the strings `true`/`false`/`1`/`0`.
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn optional_string(map: &Map<String, Value>, key: &str, check: &str) -> ApaaiResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ApaaiError::validation(format!(
            "check '{check}' has a non-string '{key}' ({})",
            json_kind(other)
        ))),
    }
}

fn decode<T: DeserializeOwned>(map: Map<String, Value>, what: &str) -> ApaaiResult<T> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| ApaaiError::validation(format!("invalid {what}: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

/// The current UTC instant as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A fresh, unique action identifier.
pub fn new_action_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
