//! Turning a [`Node`] tree into a reusable closure.
//!
//! Compilation walks the tree once. Every node becomes a closure owning the closures of its
//! children, so evaluation never looks at the tree again. Laziness (`and`, `or`, relational
//! chains, conditionals) is just a closure choosing not to call one of its children.

use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use ordermap::OrderMap;

use crate::ast::{ConstantType, Node, OperatorFn};
use crate::error::{EvalError, EvalResult, NodeError};
use crate::resolve::Resolver;
use crate::scope::{Scope, WeakScope};
use crate::trace::trace;
use crate::value::{Function, Value};

mod access;

use access::Place;

type Closure = dyn Fn(&Scope) -> EvalResult<Value>;

/// A compiled expression, cheap to clone and to evaluate repeatedly against different scopes
#[derive(Clone)]
pub struct Evaluable {
    closure: Rc<Closure>,
}

impl Evaluable {
    fn new(closure: impl Fn(&Scope) -> EvalResult<Value> + 'static) -> Self {
        Self {
            closure: Rc::new(closure),
        }
    }

    pub fn evaluate(&self, scope: &Scope) -> EvalResult<Value> {
        (self.closure)(scope)
    }
}

impl fmt::Debug for Evaluable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluable").finish_non_exhaustive()
    }
}

impl Node {
    /// Compile the tree against `resolver`, which receives every operator, unbound function
    /// call, number literal and range.
    pub fn compile(&self, resolver: Rc<dyn Resolver>) -> Result<Evaluable, NodeError> {
        trace!("compiling {}", self.get_identifier());
        Compiler { resolver }.compile(self)
    }
}

fn evaluate_all(evaluables: &[Evaluable], scope: &Scope) -> EvalResult<Vec<Value>> {
    evaluables.iter().map(|e| e.evaluate(scope)).collect()
}

struct Compiler {
    resolver: Rc<dyn Resolver>,
}

impl Compiler {
    fn compile_all(&self, nodes: &[Rc<Node>]) -> Result<Vec<Evaluable>, NodeError> {
        nodes.iter().map(|node| self.compile(node)).collect()
    }

    fn compile(&self, node: &Node) -> Result<Evaluable, NodeError> {
        node.validate()?;
        let resolver = Rc::clone(&self.resolver);

        let evaluable = match node {
            Node::Constant { value, value_type } => {
                let constant: EvalResult<Value> = match value_type {
                    ConstantType::Number => resolver.number(value).map_err(EvalError::from),
                    ConstantType::String => Ok(Value::Str(value.clone())),
                    ConstantType::Boolean => Ok(Value::Bool(value == "true")),
                    ConstantType::Null => Ok(Value::Null),
                    ConstantType::Undefined => Ok(Value::Undefined),
                };
                Evaluable::new(move |_| constant.clone())
            }
            Node::Symbol { name } => {
                let name = name.clone();
                Evaluable::new(move |scope| {
                    scope
                        .get(&name)
                        .or_else(|| resolver.lookup(&name))
                        .ok_or_else(|| EvalError::UndefinedSymbol { name: name.clone() })
                })
            }
            Node::Operator { fn_name, args, .. } => {
                let args = self.compile_all(args)?;
                let fn_name = fn_name.clone();
                match node.operator_fn() {
                    Some(op @ (OperatorFn::And | OperatorFn::Or)) if args.len() == 2 => {
                        let (lhs, rhs) = (args[0].clone(), args[1].clone());
                        // `and` stops on a falsy left operand, `or` on a truthy one
                        let decisive = op == OperatorFn::Or;
                        Evaluable::new(move |scope| {
                            let left = lhs.evaluate(scope)?;
                            if left.truthy()? == decisive {
                                return Ok(Value::Bool(decisive));
                            }
                            let right = rhs.evaluate(scope)?;
                            Ok(resolver.call(&fn_name, &[left, right])?)
                        })
                    }
                    _ => Evaluable::new(move |scope| {
                        Ok(resolver.call(&fn_name, &evaluate_all(&args, scope)?)?)
                    }),
                }
            }
            Node::Relational {
                conditionals,
                params,
            } => {
                let conditionals = conditionals.clone();
                let params = self.compile_all(params)?;
                Evaluable::new(move |scope| {
                    let Some((first, rest)) = params.split_first() else {
                        return Ok(Value::Bool(true));
                    };
                    let mut lhs = first.evaluate(scope)?;
                    for (conditional, param) in conditionals.iter().zip_eq(rest) {
                        let rhs = param.evaluate(scope)?;
                        if !resolver.call(conditional, &[lhs, rhs.clone()])?.truthy()? {
                            return Ok(Value::Bool(false));
                        }
                        lhs = rhs;
                    }
                    Ok(Value::Bool(true))
                })
            }
            Node::Conditional {
                condition,
                true_expr,
                false_expr,
            } => {
                let condition = self.compile(condition)?;
                let true_expr = self.compile(true_expr)?;
                let false_expr = self.compile(false_expr)?;
                Evaluable::new(move |scope| {
                    if condition.evaluate(scope)?.truthy()? {
                        true_expr.evaluate(scope)
                    } else {
                        false_expr.evaluate(scope)
                    }
                })
            }
            Node::Block { blocks } => {
                let entries = blocks
                    .iter()
                    .map(|entry| Ok((self.compile(&entry.node)?, entry.visible)))
                    .collect::<Result<Vec<_>, NodeError>>()?;
                Evaluable::new(move |scope| {
                    let mut result = Value::Undefined;
                    for (entry, visible) in &entries {
                        let value = entry.evaluate(scope)?;
                        if *visible {
                            result = value;
                        }
                    }
                    Ok(result)
                })
            }
            Node::Range { start, end, step } => {
                let start = self.compile(start)?;
                let end = self.compile(end)?;
                let step = step.as_deref().map(|step| self.compile(step)).transpose()?;
                Evaluable::new(move |scope| {
                    let start = start.evaluate(scope)?;
                    let end = end.evaluate(scope)?;
                    let step = match &step {
                        Some(step) => step.evaluate(scope)?,
                        None => resolver.number("1")?,
                    };
                    Ok(resolver.build_range(start, end, step)?)
                })
            }
            Node::Assignment {
                object,
                index,
                value,
            } => {
                let value = self.compile(value)?;
                let target = match index {
                    Some(index) => Place::Member {
                        object: Box::new(self.place(object)?),
                        index: self.index(index)?,
                    },
                    None => self.place(object)?,
                };
                Evaluable::new(move |scope| {
                    let value = value.evaluate(scope)?;
                    target.set(scope, value.clone())?;
                    Ok(value)
                })
            }
            Node::FunctionAssignment { name, params, expr } => {
                let name = name.clone();
                let params = params.clone();
                let body = self.compile(expr)?;
                Evaluable::new(move |scope| {
                    let function = user_function(&name, &params, &body, scope);
                    scope.set(name.clone(), function.clone());
                    Ok(function)
                })
            }
            Node::Function { callee, args } => {
                let args = self.compile_all(args)?;
                match callee.as_ref() {
                    Node::Symbol { name } => {
                        let name = name.clone();
                        Evaluable::new(move |scope| match scope.get(&name) {
                            Some(Value::Function(function)) => {
                                function.call(&evaluate_all(&args, scope)?, scope)
                            }
                            Some(other) => Err(EvalError::NotAFunction {
                                name: name.clone(),
                                kind: other.kind(),
                            }),
                            None => Ok(resolver.call(&name, &evaluate_all(&args, scope)?)?),
                        })
                    }
                    other => {
                        let name = other.to_string();
                        let callee = self.compile(other)?;
                        Evaluable::new(move |scope| match callee.evaluate(scope)? {
                            Value::Function(function) => {
                                function.call(&evaluate_all(&args, scope)?, scope)
                            }
                            value => Err(EvalError::NotAFunction {
                                name: name.clone(),
                                kind: value.kind(),
                            }),
                        })
                    }
                }
            }
            Node::Array { items } => {
                let items = self.compile_all(items)?;
                Evaluable::new(move |scope| Ok(resolver.array(evaluate_all(&items, scope)?)?))
            }
            Node::Object { properties } => {
                let properties = properties
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.compile(value)?)))
                    .collect::<Result<Vec<_>, NodeError>>()?;
                Evaluable::new(move |scope| {
                    properties
                        .iter()
                        .map(|(key, value)| Ok((key.clone(), value.evaluate(scope)?)))
                        .collect::<EvalResult<OrderMap<_, _>>>()
                        .map(Value::Object)
                })
            }
            Node::Parenthesis { content } => self.compile(content)?,
            Node::Index { .. } => {
                let index = self.index(node)?;
                Evaluable::new(move |scope| index.evaluate(scope, None))
            }
            Node::Accessor { object, index } => {
                let object = self.compile(object)?;
                let index = self.index(index)?;
                Evaluable::new(move |scope| index.get(scope, object.evaluate(scope)?))
            }
        };
        Ok(evaluable)
    }
}

/// Where a user defined function looks up the names its parameters do not bind
enum Captured {
    /// Outermost frame, owned by the host. It usually stores the function itself, so a
    /// strong handle would keep it alive forever.
    Root(WeakScope),
    /// Frame of an enclosing call, which would otherwise be gone once that call returns
    Frame(Scope),
}

impl Captured {
    fn new(scope: &Scope) -> Self {
        if scope.is_root() {
            Self::Root(scope.downgrade())
        } else {
            Self::Frame(scope.clone())
        }
    }

    fn scope(&self) -> Option<Scope> {
        match self {
            Self::Root(weak) => weak.upgrade(),
            Self::Frame(scope) => Some(scope.clone()),
        }
    }
}

/// The value bound by `name(params) = body`. Calls run in a fresh child of the scope the
/// function was defined in, or of the caller's scope once a dropped root is all it had.
fn user_function(name: &str, params: &[String], body: &Evaluable, defining: &Scope) -> Value {
    let defining = Captured::new(defining);
    let fn_name = name.to_owned();
    let declared = params.to_vec();
    let body = body.clone();
    let function = Function::with_scope(name, params.to_vec(), move |args, caller| {
        if args.len() != declared.len() {
            return Err(EvalError::WrongArgumentCount {
                name: fn_name.clone(),
                expected: declared.len(),
                got: args.len(),
            });
        }
        let frame = defining.scope().unwrap_or_else(|| caller.clone()).child();
        for (param, arg) in declared.iter().zip_eq(args) {
            frame.set(param.clone(), arg.clone());
        }
        body.evaluate(&frame)
    });
    Value::Function(function)
}
