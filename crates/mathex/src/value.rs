use std::any::Any;
use std::fmt::{self, Display};
use std::rc::Rc;

use itertools::Itertools;
use ordermap::OrderMap;
use strum::EnumDiscriminants;

use crate::error::{EvalError, EvalResult};
use crate::scope::Scope;

/// A value flowing through an evaluation.
///
/// The core never computes with these itself, it only moves them between the scope and the
/// [`Resolver`](crate::resolve::Resolver). Representations the core does not know about
/// travel as [`Value::Custom`].
#[derive(Debug, Clone, Default, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind), derive(Hash))]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    Object(OrderMap<String, Value>),
    /// Evaluated dimensions of an index expression like `a[2, 1:3]`
    Index(Vec<Value>),
    Function(Function),
    Custom(Rc<dyn CustomValue>),
}

/// Hook for externally defined value types, e.g. big numbers or units
pub trait CustomValue: fmt::Debug + Display {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Truthiness used by conditionals and short-circuiting operators.
    /// `None` means the type cannot be used as a condition.
    fn truthy(&self) -> Option<bool> {
        None
    }

    fn equals(&self, _other: &dyn CustomValue) -> bool {
        false
    }
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        use ValueKind::*;
        match self {
            Undefined => "undefined",
            Null => "null",
            Bool => "boolean",
            Number => "number",
            Str => "string",
            Array => "array",
            Object => "object",
            Index => "index",
            Function => "function",
            Custom => "custom",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        ValueKind::from(self)
    }

    /// Name of the type, asking custom values for theirs
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Custom(custom) => custom.type_name(),
            other => other.kind().name(),
        }
    }

    pub fn truthy(&self) -> EvalResult<bool> {
        let truth = match self {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0 && !n.is_nan()),
            Value::Str(s) => Some(!s.is_empty()),
            Value::Null | Value::Undefined => Some(false),
            Value::Custom(custom) => custom.truthy(),
            Value::Array(..) | Value::Object(..) | Value::Index(..) | Value::Function(..) => None,
        };
        truth.ok_or(EvalError::UnsupportedCondition { kind: self.kind() })
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn function<F>(name: &str, imp: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult<Value> + 'static,
    {
        Self::Function(Function::native(name, imp))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Array(a), Array(b)) | (Index(a), Index(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Function(a), Function(b)) => a.ptr_eq(b),
            (Custom(a), Custom(b)) => Rc::ptr_eq(a, b) || a.equals(b.as_ref()),
            _ => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else {
        n.to_string()
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Object(props) => write!(
                f,
                "{{{}}}",
                props.iter().map(|(k, v)| format!("{k:?}: {v}")).join(", ")
            ),
            Value::Index(dims) => write!(f, "index({})", dims.iter().join(", ")),
            Value::Function(function) => write!(f, "{function}"),
            Value::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Self::Function(function)
    }
}

type Callable = dyn Fn(&[Value], &Scope) -> EvalResult<Value>;

/// A callable value: either defined in an expression (`f(x) = x^2`) or handed in by the host
#[derive(Clone)]
pub struct Function {
    name: String,
    params: Option<Vec<String>>,
    imp: Rc<Callable>,
}

impl Function {
    pub fn native<F>(name: &str, imp: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult<Value> + 'static,
    {
        Self {
            name: name.to_owned(),
            params: None,
            imp: Rc::new(move |args, _| imp(args)),
        }
    }

    pub(crate) fn with_scope<F>(name: &str, params: Vec<String>, imp: F) -> Self
    where
        F: Fn(&[Value], &Scope) -> EvalResult<Value> + 'static,
    {
        Self {
            name: name.to_owned(),
            params: Some(params),
            imp: Rc::new(imp),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters, `None` for host functions
    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    /// `scope` is the caller's scope
    pub fn call(&self, args: &[Value], scope: &Scope) -> EvalResult<Value> {
        (self.imp)(args, scope)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.imp, &other.imp)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            Some(params) => write!(f, "{}({})", self.name, params.join(", ")),
            None => write!(f, "{}(...)", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Meters(f64);

    impl Display for Meters {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} m", self.0)
        }
    }

    impl CustomValue for Meters {
        fn type_name(&self) -> &'static str {
            "Unit"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn truthy(&self) -> Option<bool> {
            Some(self.0 != 0.0)
        }
    }

    #[test]
    fn truthiness() {
        assert_eq!(Value::Bool(true).truthy(), Ok(true));
        assert_eq!(Value::Number(0.0).truthy(), Ok(false));
        assert_eq!(Value::Number(f64::NAN).truthy(), Ok(false));
        assert_eq!(Value::Number(-2.0).truthy(), Ok(true));
        assert_eq!(Value::from("").truthy(), Ok(false));
        assert_eq!(Value::Null.truthy(), Ok(false));
        assert_eq!(Value::Custom(Rc::new(Meters(3.0))).truthy(), Ok(true));
        assert_eq!(
            Value::Array(vec![]).truthy(),
            Err(EvalError::UnsupportedCondition {
                kind: ValueKind::Array
            })
        );
    }

    #[test]
    fn display() {
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Number(6.0).to_string(), "6");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(
            Value::Array(vec![1.0.into(), "a".into()]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(Value::Custom(Rc::new(Meters(2.0))).to_string(), "2 m");
        assert_eq!(Value::Custom(Rc::new(Meters(2.0))).type_name(), "Unit");
    }

    #[test]
    fn functions_compare_by_identity() {
        let f = Function::native("f", |_| Ok(Value::Null));
        let g = Function::native("f", |_| Ok(Value::Null));
        assert_eq!(Value::Function(f.clone()), Value::Function(f.clone()));
        assert_ne!(Value::Function(f), Value::Function(g));
    }
}
