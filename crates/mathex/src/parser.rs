use std::fmt;
use std::rc::Rc;

use crate::error::{Error, EvalError};
use crate::parse::parse;
use crate::resolve::{Dispatcher, Resolver};
use crate::scope::Scope;
use crate::trace::trace;
use crate::value::Value;

/// A scope that outlives single evaluations, so that variables and functions defined by one
/// call to [`Parser::eval`] are visible to the next.
///
/// ```
/// use mathex::{Parser, Value};
///
/// let mut parser = Parser::new();
/// parser.eval("f(x) = x^2 + 1").unwrap();
/// assert_eq!(parser.eval("f(3)").unwrap(), Value::Number(10.0));
/// ```
pub struct Parser {
    scope: Scope,
    resolver: Rc<dyn Resolver>,
}

impl Parser {
    /// A parser backed by [`Dispatcher::standard`]
    pub fn new() -> Self {
        Self::with_resolver(Rc::new(Dispatcher::standard()))
    }

    pub fn with_resolver(resolver: Rc<dyn Resolver>) -> Self {
        Self {
            scope: Scope::new(),
            resolver,
        }
    }

    /// Parse, compile and evaluate `source` in the persistent scope
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let node = parse(source)?;
        let value = node.compile(Rc::clone(&self.resolver))?.evaluate(&self.scope)?;
        trace!("eval {source:?} = {value}");
        Ok(value)
    }

    pub fn get(&self, name: &str) -> Result<Value, EvalError> {
        self.scope.get(name).ok_or_else(|| EvalError::UndefinedSymbol {
            name: name.to_owned(),
        })
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.scope.set(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.scope.remove(name)
    }

    /// Forget every variable and function
    pub fn clear(&mut self) {
        self.scope.clear();
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
