use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::error::DispatchError;
use crate::value::{Value, ValueKind};

mod standard;

/// Everything numeric is delegated through this seam.
///
/// Evaluation never does arithmetic itself: operators and unbound function names are
/// forwarded to [`Resolver::call`] under their function name (`add`, `smaller`, `subset`, ...),
/// number literals go through [`Resolver::number`] and ranges through
/// [`Resolver::build_range`].
pub trait Resolver {
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, DispatchError>;

    /// Build the value of `start:step:end`. The result is handed back to the caller as is.
    fn build_range(&self, start: Value, end: Value, step: Value) -> Result<Value, DispatchError> {
        self.call("range", &[start, end, step])
    }

    /// Convert the literal text of a number constant
    fn number(&self, literal: &str) -> Result<Value, DispatchError> {
        literal
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| DispatchError::failed("number", format!("invalid number literal {literal}")))
    }

    /// Fallback for symbols that are not bound in the scope, e.g. constants like `pi`
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Build the value of an array literal
    fn array(&self, items: Vec<Value>) -> Result<Value, DispatchError> {
        Ok(Value::Array(items))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Any,
    Kind(ValueKind),
}

impl Param {
    pub const NUMBER: Self = Self::Kind(ValueKind::Number);
    pub const ARRAY: Self = Self::Kind(ValueKind::Array);
    pub const STRING: Self = Self::Kind(ValueKind::Str);
    pub const INDEX: Self = Self::Kind(ValueKind::Index);

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(kind) => value.kind() == kind,
        }
    }
}

pub type Implementation = Rc<dyn Fn(&[Value]) -> Result<Value, DispatchError>>;

#[derive(Clone)]
pub struct Signature {
    params: Vec<Param>,
    /// The last parameter may repeat
    variadic: bool,
    imp: Implementation,
}

impl Signature {
    fn matches(&self, args: &[Value]) -> bool {
        if self.variadic {
            let Some((last, fixed)) = self.params.split_last() else {
                return true;
            };
            args.len() >= self.params.len()
                && fixed.iter().zip(args).all(|(p, a)| p.accepts(a))
                && args[fixed.len()..].iter().all(|a| last.accepts(a))
        } else {
            args.len() == self.params.len()
                && self.params.iter().zip(args).all(|(p, a)| p.accepts(a))
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .finish_non_exhaustive()
    }
}

/// Table driven [`Resolver`]: each function name maps to a list of signatures, the first
/// one whose parameter kinds accept the arguments is invoked.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    signatures: HashMap<String, Vec<Signature>>,
    constants: HashMap<String, Value>,
}

impl Dispatcher {
    /// Empty table, every call fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Floating point arithmetic, comparisons, logic, bitwise operators, ranges,
    /// indexing and a handful of elementary functions
    pub fn standard() -> Self {
        let mut dispatcher = Self::new();
        standard::install(&mut dispatcher);
        dispatcher
    }

    pub fn define<F>(&mut self, name: &str, params: &[Param], imp: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, DispatchError> + 'static,
    {
        self.push(name, params, false, Rc::new(imp))
    }

    /// Like [`Self::define`], but the last parameter accepts one or more arguments
    pub fn define_variadic<F>(&mut self, name: &str, params: &[Param], imp: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, DispatchError> + 'static,
    {
        self.push(name, params, true, Rc::new(imp))
    }

    fn push(&mut self, name: &str, params: &[Param], variadic: bool, imp: Implementation) -> &mut Self {
        self.signatures
            .entry(name.to_owned())
            .or_default()
            .push(Signature {
                params: params.to_vec(),
                variadic,
                imp,
            });
        self
    }

    pub fn define_constant(&mut self, name: &str, value: Value) -> &mut Self {
        self.constants.insert(name.to_owned(), value);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.signatures.contains_key(name)
    }

    /// Defined function names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.signatures.keys().map(String::as_str).sorted().collect()
    }
}

impl Resolver for Dispatcher {
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let signatures = self
            .signatures
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation {
                name: name.to_owned(),
            })?;
        let signature = signatures
            .iter()
            .find(|sig| sig.matches(args))
            .ok_or_else(|| DispatchError::NoMatchingSignature {
                name: name.to_owned(),
                args: args.iter().map(Value::kind).collect(),
            })?;
        (signature.imp)(args)
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.constants.get(name).cloned()
    }
}
