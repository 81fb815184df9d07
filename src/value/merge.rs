//! `deepMerge` (spec §4.1): combines `Object` nodes recursively; any other
//! pair of kinds is replaced wholesale by the right-hand side.

use super::Variable;

pub fn deep_merge(a: Variable, b: Variable) -> Variable {
    match (a, b) {
        (Variable::Object(mut base), Variable::Object(overlay)) => {
            for (k, v) in overlay {
                let merged = match base.remove(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v,
                };
                base.insert(k, merged);
            }
            Variable::Object(base)
        }
        (_, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn obj(pairs: impl IntoIterator<Item = (&'static str, Variable)>) -> Variable {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v);
        }
        Variable::Object(m)
    }

    #[test]
    fn merges_nested_objects_recursively() {
        let a = obj([("a", obj([("x", Variable::Number(1.0))]))]);
        let b = obj([("a", obj([("y", Variable::Number(2.0))]))]);
        let merged = deep_merge(a, b);
        let inner = merged.as_object().unwrap().get("a").unwrap().as_object().unwrap();
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn replaces_non_object_kinds_wholesale() {
        let a = Variable::Array(vec![Variable::Number(1.0)]);
        let b = Variable::Array(vec![Variable::Number(2.0)]);
        let merged = deep_merge(a, b);
        assert_eq!(merged.as_array().unwrap().len(), 1);
    }

    #[test]
    fn object_replaced_by_scalar() {
        let a = obj([("x", Variable::Number(1.0))]);
        let b = Variable::Number(5.0);
        let merged = deep_merge(a, b);
        assert!(matches!(merged, Variable::Number(n) if n == 5.0));
    }
}
