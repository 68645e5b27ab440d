use itertools::Itertools;
use thiserror::Error;

use crate::ast::NodeType;
use crate::value::ValueKind;

/// A bad token sequence. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (char {position})")]
pub struct SyntaxError {
    pub message: String,
    /// Char offset into the source, starting from 0
    pub position: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Print the source with a caret under the offending character
    pub fn pretty_print(&self, source: &str) -> String {
        let line_start = source
            .chars()
            .take(self.position)
            .collect::<String>()
            .rfind('\n')
            .map_or(0, |i| i + 1);
        let line = source[line_start..].lines().next().unwrap_or_default();
        let column = source[line_start..]
            .chars()
            .count()
            .min(self.position - source[..line_start].chars().count());
        format!("{line}\n{}^ {self}", " ".repeat(column))
    }
}

/// Wrong children handed to a node builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("{node} expects {expected} in slot '{slot}', got {got}")]
    InvalidSlot {
        node: NodeType,
        slot: String,
        expected: &'static str,
        got: NodeType,
    },
    #[error("{node}: '{name}' is not a valid identifier")]
    InvalidIdentifier { node: NodeType, name: String },
    #[error("{node}: parameter '{name}' is declared more than once")]
    DuplicateParameter { node: NodeType, name: String },
    #[error("{node} expects {expected} arguments, got {got}")]
    ArityMismatch {
        node: NodeType,
        expected: &'static str,
        got: usize,
    },
    #[error("dot notation index must hold exactly one string constant")]
    DotNotation,
}

/// Failure reported by a [`crate::resolve::Resolver`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("undefined function {name}")]
    UnknownOperation { name: String },
    #[error("no matching signature for {name}({})", .args.iter().join(", "))]
    NoMatchingSignature { name: String, args: Vec<ValueKind> },
    #[error("{name}: {message}")]
    Failed { name: String, message: String },
}

impl DispatchError {
    pub fn failed(name: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.to_owned(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined symbol {name}")]
    UndefinedSymbol { name: String },
    #[error("{name} is not a function but {kind}")]
    NotAFunction { name: String, kind: ValueKind },
    #[error("{}", wrong_count_message(.name, .expected, .got))]
    WrongArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("unsupported type of condition: {kind}")]
    UnsupportedCondition { kind: ValueKind },
    #[error("cannot read or write property '{property}' of {kind}")]
    NotAnObject { property: String, kind: ValueKind },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn wrong_count_message(name: &str, expected: &usize, got: &usize) -> String {
    let amount = if got > expected { "many" } else { "few" };
    format!("too {amount} arguments in function {name} (expected: {expected}, actual: {got})")
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("unknown node type '{type_name}'")]
    UnknownNodeType { type_name: String },
    #[error("{node} is missing field '{field}'")]
    MissingField { node: String, field: String },
    #[error("{node} field '{field}' must be {expected}")]
    MalformedField {
        node: String,
        field: String,
        expected: &'static str,
    },
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error(transparent)]
    InvalidNode(#[from] NodeError),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Everything that can go wrong between a source string and a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        Self::Eval(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = SyntaxError::new("Parenthesis ) expected", 4);
        assert_eq!(err.to_string(), "Parenthesis ) expected (char 4)");
        assert_eq!(
            err.pretty_print("(1+2"),
            "(1+2\n    ^ Parenthesis ) expected (char 4)"
        );
    }

    #[test]
    fn pretty_print_on_second_line() {
        let err = SyntaxError::new("Unexpected operator *", 4);
        assert_eq!(err.pretty_print("a\nb +* c"), "b +* c\n  ^ Unexpected operator * (char 4)");
    }

    #[test]
    fn argument_count_messages() {
        let err = EvalError::WrongArgumentCount {
            name: "f".to_owned(),
            expected: 2,
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "too many arguments in function f (expected: 2, actual: 3)"
        );
    }

    #[test]
    fn dispatch_errors_pass_through() {
        let dispatch = DispatchError::UnknownOperation {
            name: "frobnicate".to_owned(),
        };
        let err: Error = dispatch.clone().into();
        assert_eq!(err, Error::Eval(EvalError::Dispatch(dispatch)));
        assert_eq!(err.to_string(), "undefined function frobnicate");
    }
}
