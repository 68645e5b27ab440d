//! An embeddable expression language.
//!
//! Source text is tokenized ([`lex`]), parsed into a [`Node`] tree ([`parse`]), and the tree
//! is compiled into an [`Evaluable`] that runs against a [`Scope`]. All arithmetic is
//! delegated to a [`Resolver`]; [`Dispatcher::standard`] is a floating point one.
//! Trees can also be walked, rewritten, rendered as text or LaTeX, and serialized to JSON.

pub mod ast;
pub mod compile;
pub mod display;
pub mod error;
pub mod lex;
pub mod parse;
pub mod parser;
pub mod resolve;
pub mod scope;
pub mod trace;
pub mod value;

use std::rc::Rc;

pub use ast::{BlockEntry, ConstantType, Node, NodeType, OperatorFn};
pub use compile::Evaluable;
pub use display::{Implicit, Parenthesis, StringOptions};
pub use error::{DispatchError, Error, EvalError, NodeError, SerializationError, SyntaxError};
pub use parse::parse;
pub use parser::Parser;
pub use resolve::{Dispatcher, Param, Resolver};
pub use scope::Scope;
pub use value::{CustomValue, Function, Value, ValueKind};

/// Parse, compile against [`Dispatcher::standard`] and evaluate in one go
pub fn evaluate(source: &str, scope: &Scope) -> Result<Value, Error> {
    let evaluable = parse(source)?.compile(Rc::new(Dispatcher::standard()))?;
    Ok(evaluable.evaluate(scope)?)
}
