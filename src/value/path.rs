//! `getByPath` / `setByPath` (spec §4.1): path indexing walks `Object` nodes
//! only; `setByPath` creates intermediate objects and fails if an
//! intermediate node is an `Array` or a `Primitive`.

use super::Variable;
use crate::error::{MapRuntimeError, Result, UnexpectedError};

pub fn get_by_path<'a>(v: &'a Variable, path: &[&str]) -> Option<&'a Variable> {
    let mut current = v;
    for segment in path {
        match current {
            Variable::Object(map) => current = map.get(*segment)?,
            _ => return None,
        }
    }
    Some(current)
}

pub fn set_by_path(root: &mut Variable, path: &[&str], value: Variable) -> Result<()> {
    if path.is_empty() {
        *root = value;
        return Ok(());
    }

    if root.is_none() {
        *root = Variable::object();
    }

    let map = match root {
        Variable::Object(m) => m,
        other => {
            return Err(MapRuntimeError::Unexpected(UnexpectedError::Unexpected(
                format!(
                    "cannot set path {:?}: intermediate node is {}",
                    path,
                    other.kind_name()
                ),
            )));
        }
    };

    let (head, rest) = (path[0], &path[1..]);
    if rest.is_empty() {
        map.insert(head.to_string(), value);
        Ok(())
    } else {
        let entry = map
            .entry(head.to_string())
            .or_insert_with(Variable::object);
        set_by_path(entry, rest, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_path_walks_nested_objects() {
        let mut root = Variable::object();
        set_by_path(&mut root, &["a", "b", "c"], Variable::Number(1.0)).unwrap();
        let found = get_by_path(&root, &["a", "b", "c"]).unwrap();
        assert!(matches!(found, Variable::Number(n) if *n == 1.0));
    }

    #[test]
    fn set_by_path_creates_intermediate_objects() {
        let mut root = Variable::Null;
        set_by_path(&mut root, &["a", "b"], Variable::string("v")).unwrap();
        assert_eq!(
            get_by_path(&root, &["a", "b"]).unwrap().as_str(),
            Some("v")
        );
    }

    #[test]
    fn set_by_path_fails_on_array_intermediate() {
        let mut root = Variable::Array(vec![]);
        let err = set_by_path(&mut root, &["a"], Variable::Number(1.0));
        assert!(err.is_err());
    }

    #[test]
    fn set_by_path_fails_on_primitive_intermediate() {
        let mut root = Variable::Number(5.0);
        let err = set_by_path(&mut root, &["a"], Variable::Number(1.0));
        assert!(err.is_err());
    }
}
