//! Reading and writing through accessors: `a[2, end]`, `obj.name`, `a.b[1] = 3`

use std::rc::Rc;

use super::{Compiler, Evaluable};
use crate::ast::{Node, NodeType};
use crate::error::{EvalError, EvalResult, NodeError};
use crate::resolve::Resolver;
use crate::scope::Scope;
use crate::value::Value;

struct Dimension {
    value: Evaluable,
    /// Mentions `end`, so it needs the size of the indexed object
    uses_end: bool,
}

/// A compiled [`Node::Index`]
#[derive(Clone)]
pub(super) struct CompiledIndex {
    property: Option<String>,
    dot_notation: bool,
    dimensions: Rc<[Dimension]>,
    resolver: Rc<dyn Resolver>,
}

impl CompiledIndex {
    /// Evaluate the dimensions into an index value. With an object, `end` is bound to the
    /// length of the matching dimension.
    pub(super) fn evaluate(&self, scope: &Scope, object: Option<&Value>) -> EvalResult<Value> {
        let mut size: Option<Value> = None;
        let mut values = Vec::with_capacity(self.dimensions.len());
        for (i, dim) in self.dimensions.iter().enumerate() {
            let value = match object {
                Some(object) if dim.uses_end => {
                    if size.is_none() {
                        size = Some(self.resolver.call("size", &[object.clone()])?);
                    }
                    let end = match &size {
                        Some(Value::Array(dims)) => dims.get(i).cloned().unwrap_or_default(),
                        Some(other) => other.clone(),
                        None => Value::Undefined,
                    };
                    let frame = scope.child();
                    frame.set("end", end);
                    dim.value.evaluate(&frame)?
                }
                _ => dim.value.evaluate(scope)?,
            };
            values.push(value);
        }
        Ok(self.resolver.call("index", &values)?)
    }

    pub(super) fn get(&self, scope: &Scope, object: Value) -> EvalResult<Value> {
        match (&self.property, object) {
            (Some(property), Value::Object(props)) => {
                Ok(props.get(property).cloned().unwrap_or_default())
            }
            (Some(property), other) if self.dot_notation => Err(EvalError::NotAnObject {
                property: property.clone(),
                kind: other.kind(),
            }),
            (_, object) => {
                let index = self.evaluate(scope, Some(&object))?;
                Ok(self.resolver.call("subset", &[object, index])?)
            }
        }
    }

    /// Returns the updated object
    pub(super) fn set(&self, scope: &Scope, object: Value, value: Value) -> EvalResult<Value> {
        match (&self.property, object) {
            (Some(property), Value::Object(mut props)) => {
                props.insert(property.clone(), value);
                Ok(Value::Object(props))
            }
            (Some(property), other) if self.dot_notation => Err(EvalError::NotAnObject {
                property: property.clone(),
                kind: other.kind(),
            }),
            (_, object) => {
                let index = self.evaluate(scope, Some(&object))?;
                Ok(self.resolver.call("subset", &[object, index, value])?)
            }
        }
    }
}

/// Assignment target. Writes go back up the chain until they reach a symbol.
pub(super) enum Place {
    Symbol(String),
    Member {
        object: Box<Place>,
        index: CompiledIndex,
    },
    /// Not rooted in a symbol, writes are dropped
    Temporary(Evaluable),
}

impl Place {
    pub(super) fn get(&self, scope: &Scope) -> EvalResult<Value> {
        match self {
            Self::Symbol(name) => scope
                .get(name)
                .ok_or_else(|| EvalError::UndefinedSymbol { name: name.clone() }),
            Self::Member { object, index } => index.get(scope, object.get(scope)?),
            Self::Temporary(value) => value.evaluate(scope),
        }
    }

    pub(super) fn set(&self, scope: &Scope, value: Value) -> EvalResult<()> {
        match self {
            Self::Symbol(name) => {
                scope.set(name.clone(), value);
                Ok(())
            }
            Self::Member { object, index } => {
                let updated = index.set(scope, object.get(scope)?, value)?;
                object.set(scope, updated)
            }
            Self::Temporary(_) => Ok(()),
        }
    }
}

impl Compiler {
    pub(super) fn index(&self, node: &Node) -> Result<CompiledIndex, NodeError> {
        node.validate()?;
        let Node::Index {
            dimensions,
            dot_notation,
        } = node
        else {
            return Err(NodeError::InvalidSlot {
                node: NodeType::AccessorNode,
                slot: "index".to_owned(),
                expected: "IndexNode",
                got: node.node_type(),
            });
        };
        let dims = dimensions
            .iter()
            .map(|dim| {
                Ok(Dimension {
                    value: self.compile(dim)?,
                    uses_end: !dim
                        .filter(|n, _, _| matches!(n, Node::Symbol { name } if name == "end"))
                        .is_empty(),
                })
            })
            .collect::<Result<Vec<_>, NodeError>>()?;
        Ok(CompiledIndex {
            property: node.object_property().map(str::to_owned),
            dot_notation: *dot_notation,
            dimensions: dims.into(),
            resolver: Rc::clone(&self.resolver),
        })
    }

    pub(super) fn place(&self, node: &Node) -> Result<Place, NodeError> {
        match node {
            Node::Symbol { name } => Ok(Place::Symbol(name.clone())),
            Node::Accessor { object, index } => Ok(Place::Member {
                object: Box::new(self.place(object)?),
                index: self.index(index)?,
            }),
            other => Ok(Place::Temporary(self.compile(other)?)),
        }
    }
}
