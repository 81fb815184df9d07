//! Value model (spec §4.1, component C1)
//!
//! A tagged-variant runtime value used throughout the map interpreter and
//! HTTP pipeline. Replaces the dynamic "anything" union the source language
//! admits with an explicit sum type (spec §9 "Dynamic Variable kind").

mod env;
mod merge;
mod path;

pub use env::{resolve_env_string, EnvSource, StdEnv, UNSET_SENTINEL};
pub use merge::deep_merge;
pub use path::{get_by_path, set_by_path};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::binary::BinaryData;
use crate::error::{MapRuntimeError, UnexpectedError};

/// A recursive tagged value (spec §3 "Variable").
#[derive(Debug, Clone)]
pub enum Variable {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Variable>),
    Object(BTreeMap<String, Variable>),
    /// Handle into the binary-data subsystem (C2).
    Binary(Arc<BinaryData>),
    /// Opaque value produced by the host-expression evaluator; the
    /// interpreter never inspects it directly, only passes it through.
    Opaque(serde_json::Value),
}

impl Variable {
    pub fn is_none(&self) -> bool {
        matches!(self, Variable::Null | Variable::Undefined)
    }

    pub fn object() -> Self {
        Variable::Object(BTreeMap::new())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Variable::String(s.into())
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Variable>> {
        match self {
            Variable::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variable::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Variable]> {
        match self {
            Variable::Array(a) => Some(a),
            _ => None,
        }
    }

    /// `castToObject` (spec §4.1): None -> {}, Object -> itself, else error.
    pub fn cast_to_object(self) -> crate::error::Result<BTreeMap<String, Variable>> {
        match self {
            Variable::Null | Variable::Undefined => Ok(BTreeMap::new()),
            Variable::Object(m) => Ok(m),
            other => Err(MapRuntimeError::Unexpected(UnexpectedError::Unexpected(
                format!("cannot cast {} to object", other.kind_name()),
            ))),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Variable::Null => "null",
            Variable::Undefined => "undefined",
            Variable::Bool(_) => "boolean",
            Variable::Number(_) => "number",
            Variable::String(_) => "string",
            Variable::Array(_) => "array",
            Variable::Object(_) => "object",
            Variable::Binary(_) => "binary",
            Variable::Opaque(_) => "opaque",
        }
    }

    /// `variableToHttpString` (spec §4.1): primitive scalars stringify;
    /// arrays of scalars pass through as a list of strings; anything else
    /// (objects, binary, opaque, arrays-of-non-scalars) fails.
    pub fn to_http_string(&self) -> crate::error::Result<String> {
        match self {
            Variable::Null | Variable::Undefined => Ok(String::new()),
            Variable::Bool(b) => Ok(b.to_string()),
            Variable::Number(n) => Ok(format_number(*n)),
            Variable::String(s) => Ok(s.clone()),
            other => Err(MapRuntimeError::Unexpected(UnexpectedError::Unexpected(
                format!("cannot stringify {} for HTTP transport", other.kind_name()),
            ))),
        }
    }

    /// Array-of-scalars variant of [`Variable::to_http_string`], used for
    /// repeated query/form parameters (spec §4.3 "arrays of scalars ->
    /// repeated parameter").
    pub fn to_http_strings(&self) -> crate::error::Result<Vec<String>> {
        match self {
            Variable::Array(items) => items.iter().map(Variable::to_http_string).collect(),
            Variable::Null | Variable::Undefined => Ok(Vec::new()),
            other => other.to_http_string().map(|s| vec![s]),
        }
    }

    /// `recursiveKeyList` (spec §4.1): flattened dotted-path keys, optionally
    /// filtered by a predicate over the leaf value.
    pub fn recursive_key_list(&self, filter: Option<&dyn Fn(&Variable) -> bool>) -> Vec<String> {
        let mut out = Vec::new();
        collect_keys(self, String::new(), filter, &mut out);
        out
    }
}

fn collect_keys(
    v: &Variable,
    prefix: String,
    filter: Option<&dyn Fn(&Variable) -> bool>,
    out: &mut Vec<String>,
) {
    match v {
        Variable::Object(map) => {
            for (k, child) in map {
                let next = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                collect_keys(child, next, filter, out);
            }
        }
        leaf => {
            if filter.map(|f| f(leaf)).unwrap_or(true) && !prefix.is_empty() {
                out.push(prefix);
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for Variable {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Variable::Null,
            serde_json::Value::Bool(b) => Variable::Bool(b),
            serde_json::Value::Number(n) => Variable::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Variable::String(s),
            serde_json::Value::Array(a) => Variable::Array(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                Variable::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<Variable> for serde_json::Value {
    fn from(v: Variable) -> Self {
        match v {
            Variable::Null | Variable::Undefined => serde_json::Value::Null,
            Variable::Bool(b) => serde_json::Value::Bool(b),
            Variable::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Variable::String(s) => serde_json::Value::String(s),
            Variable::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Variable::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            Variable::Binary(_) => serde_json::Value::Null,
            Variable::Opaque(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_http_string_scalars() {
        assert_eq!(Variable::Number(12.0).to_http_string().unwrap(), "12");
        assert_eq!(Variable::Bool(true).to_http_string().unwrap(), "true");
        assert_eq!(Variable::Null.to_http_string().unwrap(), "");
    }

    #[test]
    fn to_http_string_rejects_objects() {
        assert!(Variable::object().to_http_string().is_err());
    }

    #[test]
    fn to_http_strings_repeats_array_scalars() {
        let v = Variable::Array(vec![Variable::Number(1.0), Variable::Number(2.0)]);
        assert_eq!(v.to_http_strings().unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn cast_to_object_none_is_empty_map() {
        let obj = Variable::Null.cast_to_object().unwrap();
        assert!(obj.is_empty());
    }

    #[test]
    fn cast_to_object_rejects_primitives() {
        assert!(Variable::Number(1.0).cast_to_object().is_err());
    }

    #[test]
    fn recursive_key_list_flattens_nested_objects() {
        let mut inner = BTreeMap::new();
        inner.insert("b".to_string(), Variable::Number(1.0));
        let mut outer = BTreeMap::new();
        outer.insert("a".to_string(), Variable::Object(inner));
        let v = Variable::Object(outer);
        assert_eq!(v.recursive_key_list(None), vec!["a.b".to_string()]);
    }
}
