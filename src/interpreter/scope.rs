//! Scope (spec §3 "Scope", §4.8 scoping rules): `input`/`parameters` are
//! immutable read-only roots; user variables live in an ordered stack of
//! copy-on-write frames.

use std::collections::BTreeMap;

use crate::value::{get_by_path, set_by_path, Variable};

pub struct Scope {
    input: Variable,
    parameters: Variable,
    frames: Vec<BTreeMap<String, Variable>>,
    /// Frame indices below which an operation body must not see its
    /// caller's locals (spec §4.8 "operation body cannot read caller's
    /// locals"). The last entry, if any, is the index of the frame pushed
    /// by the innermost `push_operation_frame`; lookups and assignment-site
    /// search are restricted to `frames[boundary..]`.
    boundaries: Vec<usize>,
}

impl Scope {
    /// A fresh use-case scope (spec §4.8 "Input/parameter immutability is
    /// enforced by taking a deep clone at interpreter entry").
    pub fn new(input: Variable, parameters: Variable) -> Self {
        Self {
            input,
            parameters,
            frames: vec![BTreeMap::new()],
            boundaries: Vec::new(),
        }
    }

    pub fn input(&self) -> &Variable {
        &self.input
    }

    pub fn parameters(&self) -> &Variable {
        &self.parameters
    }

    /// The lowest frame index visible from the current frame: the top of
    /// the operation-boundary stack, or 0 if no operation frame is active.
    fn floor(&self) -> usize {
        self.boundaries.last().copied().unwrap_or(0)
    }

    /// Look up `path` against `input`/`parameters` or the visible frame
    /// stack (frames at or above the innermost operation boundary).
    pub fn get(&self, path: &[&str]) -> Option<Variable> {
        let (head, rest) = path.split_first()?;
        match *head {
            "input" => get_by_path(&self.input, rest).cloned(),
            "parameters" => get_by_path(&self.parameters, rest).cloned(),
            name => {
                for frame in self.frames[self.floor()..].iter().rev() {
                    if let Some(root) = frame.get(name) {
                        return if rest.is_empty() {
                            Some(root.clone())
                        } else {
                            get_by_path(root, rest).cloned()
                        };
                    }
                }
                None
            }
        }
    }

    /// Assign a value at `path` (spec §4.8). Writes to `input`/`parameters`
    /// are silently dropped. Otherwise writes to the frame that already
    /// declares the identifier (searched top-down, no lower than the
    /// innermost operation boundary), or the current (top) frame if
    /// undeclared.
    pub fn assign(&mut self, path: &[&str], value: Variable) -> crate::error::Result<()> {
        let Some((head, rest)) = path.split_first() else {
            return Ok(());
        };
        if *head == "input" || *head == "parameters" {
            return Ok(());
        }

        let floor = self.floor();
        let owning_frame = self.frames[floor..]
            .iter()
            .rposition(|frame| frame.contains_key(*head))
            .map(|i| floor + i)
            .unwrap_or(self.frames.len() - 1);

        let frame = &mut self.frames[owning_frame];
        if rest.is_empty() {
            frame.insert(head.to_string(), value);
            Ok(())
        } else {
            let root = frame.entry(head.to_string()).or_insert_with(Variable::object);
            set_by_path(root, rest, value)
        }
    }

    /// Bind `name` directly in the current (top) frame, overwriting any
    /// existing binding there (used for `outcome`, `args`, loop variables).
    pub fn bind(&mut self, name: impl Into<String>, value: Variable) {
        let top = self.frames.last_mut().expect("scope always has a frame");
        top.insert(name.into(), value);
    }

    /// Push a fresh frame containing only `args` (spec §4.8 "`call Op(args)`
    /// creates a fresh frame containing only `args`; operation body cannot
    /// read caller's locals"). Records the boundary so `get`/`assign` can no
    /// longer see frames below this one until it is popped.
    pub fn push_operation_frame(&mut self, args: Variable) {
        self.boundaries.push(self.frames.len());
        let mut frame = BTreeMap::new();
        frame.insert("args".to_string(), args);
        self.frames.push(frame);
    }

    /// Pop the current frame, discarding its locals (spec §4.8 "the
    /// operation's internal `result` slot never leaks"), and restore
    /// visibility into the caller's frames.
    pub fn pop_operation_frame(&mut self) {
        self.frames.pop();
        self.boundaries.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_to_input_are_dropped() {
        let mut scope = Scope::new(Variable::string("original"), Variable::object());
        scope.assign(&["input"], Variable::string("mutated")).unwrap();
        assert_eq!(scope.input().as_str(), Some("original"));
    }

    #[test]
    fn assignments_persist_within_current_frame() {
        let mut scope = Scope::new(Variable::object(), Variable::object());
        scope.assign(&["x"], Variable::Number(1.0)).unwrap();
        assert!(matches!(scope.get(&["x"]), Some(Variable::Number(n)) if n == 1.0));
    }

    #[test]
    fn operation_frame_cannot_see_caller_locals() {
        let mut scope = Scope::new(Variable::object(), Variable::object());
        scope.assign(&["callerVar"], Variable::Number(1.0)).unwrap();
        scope.push_operation_frame(Variable::object());
        assert!(scope.get(&["callerVar"]).is_none());
        scope.pop_operation_frame();
        assert!(scope.get(&["callerVar"]).is_some());
    }

    #[test]
    fn operation_locals_do_not_leak_after_pop() {
        let mut scope = Scope::new(Variable::object(), Variable::object());
        scope.push_operation_frame(Variable::object());
        scope.assign(&["opLocal"], Variable::Number(1.0)).unwrap();
        scope.pop_operation_frame();
        assert!(scope.get(&["opLocal"]).is_none());
    }
}
