use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ordermap::OrderMap;

use crate::value::Value;

#[derive(Debug, Default)]
struct Frame {
    variables: OrderMap<String, Value>,
    parent: Option<Scope>,
}

/// Shared handle to a frame of variable bindings.
///
/// Cloning the handle shares the frame. Lookups fall through to parent frames, writes
/// always land in the frame the handle points at.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    frame: Rc<RefCell<Frame>>,
}

/// Non-owning handle, held by functions defined in an expression so a scope that
/// stores such a function does not keep itself alive
#[derive(Debug, Clone, Default)]
pub struct WeakScope {
    frame: Weak<RefCell<Frame>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// New empty frame whose lookups fall back to `self`
    pub fn child(&self) -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                variables: OrderMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let frame = self.frame.borrow();
        match frame.variables.get(name) {
            Some(value) => Some(value.clone()),
            None => frame.parent.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Bind in this frame, returning the previous binding of this frame
    pub fn set(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.frame.borrow_mut().variables.insert(name.into(), value)
    }

    pub fn has(&self, name: &str) -> bool {
        let frame = self.frame.borrow();
        frame.variables.contains_key(name)
            || frame.parent.as_ref().is_some_and(|parent| parent.has(name))
    }

    /// Unbind from this frame only
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.frame.borrow_mut().variables.remove(name)
    }

    /// Drop every binding of this frame
    pub fn clear(&self) {
        self.frame.borrow_mut().variables.clear();
    }

    /// Names bound in this frame, in insertion order
    pub fn names(&self) -> Vec<String> {
        self.frame.borrow().variables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frame.borrow().variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is an outermost frame, one without a parent
    pub fn is_root(&self) -> bool {
        self.frame.borrow().parent.is_none()
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            frame: Rc::downgrade(&self.frame),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.frame.upgrade().map(|frame| Scope { frame })
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let scope = Self::new();
        for (name, value) in iter {
            scope.set(name, value);
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_frames_shadow_and_fall_through() {
        let scope: Scope = [("a", Value::Number(1.0)), ("b", Value::Number(2.0))]
            .into_iter()
            .collect();
        let child = scope.child();
        child.set("a", Value::Number(10.0));

        assert_eq!(child.get("a"), Some(Value::Number(10.0)));
        assert_eq!(child.get("b"), Some(Value::Number(2.0)));
        assert_eq!(scope.get("a"), Some(Value::Number(1.0)));
        assert!(child.has("b"));
        assert_eq!(child.names(), vec!["a"]);
    }

    #[test]
    fn clones_share_the_frame() {
        let scope = Scope::new();
        let alias = scope.clone();
        alias.set("x", Value::Bool(true));
        assert_eq!(scope.get("x"), Some(Value::Bool(true)));

        scope.clear();
        assert!(alias.is_empty());
        assert_eq!(alias.get("x"), None);
    }

    #[test]
    fn remove_only_touches_own_frame() {
        let scope: Scope = [("x", Value::Null)].into_iter().collect();
        let child = scope.child();
        assert_eq!(child.remove("x"), None);
        assert!(child.has("x"));
        assert_eq!(scope.remove("x"), Some(Value::Null));
        assert!(!child.has("x"));
    }

    #[test]
    fn only_parentless_frames_are_roots() {
        let scope = Scope::new();
        assert!(scope.is_root());
        assert!(!scope.child().is_root());
        assert!(!scope.child().child().is_root());
    }

    #[test]
    fn weak_handles_do_not_keep_frames_alive() {
        let scope = Scope::new();
        let weak = scope.downgrade();
        assert!(weak.upgrade().is_some_and(|s| s.ptr_eq(&scope)));
        drop(scope);
        assert!(weak.upgrade().is_none());
    }
}
