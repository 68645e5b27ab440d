use std::collections::HashSet;
use std::convert::Infallible;
use std::rc::Rc;

use ordermap::OrderMap;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::NodeError;
use crate::lex::is_valid_identifier;

pub mod json;
pub mod operators;
pub use operators::*;
mod traverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum NodeType {
    AccessorNode,
    ArrayNode,
    AssignmentNode,
    BlockNode,
    ConditionalNode,
    ConstantNode,
    FunctionAssignmentNode,
    FunctionNode,
    IndexNode,
    ObjectNode,
    OperatorNode,
    ParenthesisNode,
    RangeNode,
    RelationalNode,
    SymbolNode,
}

/// How the text of a [`Node::Constant`] is to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConstantType {
    /// Literal text, converted by the resolver
    Number,
    /// Decoded string contents
    String,
    Boolean,
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    pub node: Rc<Node>,
    /// Whether the entry's value is part of the block's result
    pub visible: bool,
}

/// Expression tree.
///
/// Children are shared: `clone` is shallow and copies only the top node, use
/// [`Node::clone_deep`] for a full copy. Equality is structural.
/// Build nodes through the constructor functions, they reject malformed children.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Constant {
        value: String,
        value_type: ConstantType,
    },
    Symbol {
        name: String,
    },
    Operator {
        /// Source spelling, e.g. `%` or `mod`
        op: String,
        fn_name: String,
        args: Vec<Rc<Node>>,
        /// Multiplication written by juxtaposition, as in `2x`
        implicit: bool,
    },
    Function {
        callee: Rc<Node>,
        args: Vec<Rc<Node>>,
    },
    Range {
        start: Rc<Node>,
        end: Rc<Node>,
        step: Option<Rc<Node>>,
    },
    Conditional {
        condition: Rc<Node>,
        true_expr: Rc<Node>,
        false_expr: Rc<Node>,
    },
    Assignment {
        object: Rc<Node>,
        index: Option<Rc<Node>>,
        value: Rc<Node>,
    },
    FunctionAssignment {
        name: String,
        params: Vec<String>,
        expr: Rc<Node>,
    },
    Block {
        blocks: Vec<BlockEntry>,
    },
    Array {
        items: Vec<Rc<Node>>,
    },
    Object {
        properties: OrderMap<String, Rc<Node>>,
    },
    Parenthesis {
        content: Rc<Node>,
    },
    Index {
        dimensions: Vec<Rc<Node>>,
        /// Written as `.name` instead of `["name"]`
        dot_notation: bool,
    },
    Accessor {
        object: Rc<Node>,
        index: Rc<Node>,
    },
    /// Chained comparison like `a < b <= c`
    Relational {
        conditionals: Vec<String>,
        params: Vec<Rc<Node>>,
    },
}

impl Node {
    pub fn constant(value: impl Into<String>, value_type: ConstantType) -> Self {
        Self::Constant {
            value: value.into(),
            value_type,
        }
    }

    pub fn number(literal: impl ToString) -> Self {
        Self::constant(literal.to_string(), ConstantType::Number)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::constant(value, ConstantType::String)
    }

    pub fn boolean(value: bool) -> Self {
        Self::constant(value.to_string(), ConstantType::Boolean)
    }

    pub fn null() -> Self {
        Self::constant("null", ConstantType::Null)
    }

    pub fn undefined() -> Self {
        Self::constant("undefined", ConstantType::Undefined)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol { name: name.into() }
    }

    pub fn operator(
        op: impl Into<String>,
        fn_name: impl Into<String>,
        args: Vec<Rc<Node>>,
    ) -> Result<Self, NodeError> {
        Self::Operator {
            op: op.into(),
            fn_name: fn_name.into(),
            args,
            implicit: false,
        }
        .validated()
    }

    /// Operator node for a known operator, spelled the default way
    pub fn op(op: OperatorFn, args: Vec<Rc<Node>>) -> Result<Self, NodeError> {
        Self::operator(op.symbol(), op.to_string(), args)
    }

    pub fn implicit_multiply(lhs: impl Into<Rc<Node>>, rhs: impl Into<Rc<Node>>) -> Self {
        Self::Operator {
            op: "*".to_owned(),
            fn_name: OperatorFn::Multiply.to_string(),
            args: vec![lhs.into(), rhs.into()],
            implicit: true,
        }
    }

    pub fn function(callee: impl Into<Rc<Node>>, args: Vec<Rc<Node>>) -> Self {
        Self::Function {
            callee: callee.into(),
            args,
        }
    }

    /// Call of a function by name, e.g. `sqrt(x)`
    pub fn call(name: impl Into<String>, args: Vec<Rc<Node>>) -> Self {
        Self::function(Self::symbol(name), args)
    }

    pub fn range(
        start: impl Into<Rc<Node>>,
        end: impl Into<Rc<Node>>,
        step: Option<Rc<Node>>,
    ) -> Self {
        Self::Range {
            start: start.into(),
            end: end.into(),
            step,
        }
    }

    pub fn conditional(
        condition: impl Into<Rc<Node>>,
        true_expr: impl Into<Rc<Node>>,
        false_expr: impl Into<Rc<Node>>,
    ) -> Self {
        Self::Conditional {
            condition: condition.into(),
            true_expr: true_expr.into(),
            false_expr: false_expr.into(),
        }
    }

    pub fn assignment(
        object: impl Into<Rc<Node>>,
        index: Option<Rc<Node>>,
        value: impl Into<Rc<Node>>,
    ) -> Result<Self, NodeError> {
        Self::Assignment {
            object: object.into(),
            index,
            value: value.into(),
        }
        .validated()
    }

    pub fn function_assignment(
        name: impl Into<String>,
        params: Vec<String>,
        expr: impl Into<Rc<Node>>,
    ) -> Result<Self, NodeError> {
        Self::FunctionAssignment {
            name: name.into(),
            params,
            expr: expr.into(),
        }
        .validated()
    }

    pub fn block(blocks: Vec<BlockEntry>) -> Self {
        Self::Block { blocks }
    }

    pub fn array(items: Vec<Rc<Node>>) -> Self {
        Self::Array { items }
    }

    pub fn object(properties: OrderMap<String, Rc<Node>>) -> Self {
        Self::Object { properties }
    }

    pub fn parenthesis(content: impl Into<Rc<Node>>) -> Self {
        Self::Parenthesis {
            content: content.into(),
        }
    }

    pub fn index(dimensions: Vec<Rc<Node>>, dot_notation: bool) -> Result<Self, NodeError> {
        Self::Index {
            dimensions,
            dot_notation,
        }
        .validated()
    }

    /// Index for `.name`
    pub fn property_index(name: impl Into<String>) -> Self {
        Self::Index {
            dimensions: vec![Rc::new(Self::string(name))],
            dot_notation: true,
        }
    }

    pub fn accessor(
        object: impl Into<Rc<Node>>,
        index: impl Into<Rc<Node>>,
    ) -> Result<Self, NodeError> {
        Self::Accessor {
            object: object.into(),
            index: index.into(),
        }
        .validated()
    }

    pub fn relational(conditionals: Vec<String>, params: Vec<Rc<Node>>) -> Result<Self, NodeError> {
        Self::Relational {
            conditionals,
            params,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, NodeError> {
        self.validate()?;
        Ok(self)
    }

    /// Check the invariants of this node's own slots. Children are not visited.
    pub fn validate(&self) -> Result<(), NodeError> {
        let invalid_slot = |slot: &str, expected: &'static str, got: &Node| {
            Err(NodeError::InvalidSlot {
                node: self.node_type(),
                slot: slot.to_owned(),
                expected,
                got: got.node_type(),
            })
        };
        match self {
            Self::Operator { args, .. } if args.is_empty() => Err(NodeError::ArityMismatch {
                node: NodeType::OperatorNode,
                expected: "at least 1",
                got: 0,
            }),
            Self::Assignment { object, index, .. } => {
                match object.as_ref() {
                    Self::Symbol { name } if name == "end" => {
                        return Err(NodeError::InvalidIdentifier {
                            node: NodeType::AssignmentNode,
                            name: name.clone(),
                        });
                    }
                    Self::Symbol { .. } | Self::Accessor { .. } => {}
                    other => return invalid_slot("object", "SymbolNode or AccessorNode", other),
                }
                match index.as_deref() {
                    Some(Self::Index { .. }) | None => Ok(()),
                    Some(other) => invalid_slot("index", "IndexNode", other),
                }
            }
            Self::FunctionAssignment { name, params, .. } => {
                let mut seen = HashSet::new();
                for ident in std::iter::once(name).chain(params) {
                    if !is_valid_identifier(ident) {
                        return Err(NodeError::InvalidIdentifier {
                            node: NodeType::FunctionAssignmentNode,
                            name: ident.clone(),
                        });
                    }
                }
                for param in params {
                    if !seen.insert(param) {
                        return Err(NodeError::DuplicateParameter {
                            node: NodeType::FunctionAssignmentNode,
                            name: param.clone(),
                        });
                    }
                }
                Ok(())
            }
            Self::Index {
                dimensions,
                dot_notation: true,
            } => match dimensions.as_slice() {
                [dim]
                    if matches!(
                        dim.as_ref(),
                        Self::Constant {
                            value_type: ConstantType::String,
                            ..
                        }
                    ) =>
                {
                    Ok(())
                }
                _ => Err(NodeError::DotNotation),
            },
            Self::Accessor { index, .. } => match index.as_ref() {
                Self::Index { .. } => Ok(()),
                other => invalid_slot("index", "IndexNode", other),
            },
            Self::Relational {
                conditionals,
                params,
            } => {
                if conditionals.is_empty() || params.len() != conditionals.len() + 1 {
                    return Err(NodeError::ArityMismatch {
                        node: NodeType::RelationalNode,
                        expected: "one more than the number of comparisons",
                        got: params.len(),
                    });
                }
                match conditionals.iter().find(|c| {
                    !c.parse::<OperatorFn>().is_ok_and(OperatorFn::is_relational)
                }) {
                    Some(bad) => Err(NodeError::InvalidIdentifier {
                        node: NodeType::RelationalNode,
                        name: bad.clone(),
                    }),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        use NodeType::*;
        match self {
            Self::Constant { .. } => ConstantNode,
            Self::Symbol { .. } => SymbolNode,
            Self::Operator { .. } => OperatorNode,
            Self::Function { .. } => FunctionNode,
            Self::Range { .. } => RangeNode,
            Self::Conditional { .. } => ConditionalNode,
            Self::Assignment { .. } => AssignmentNode,
            Self::FunctionAssignment { .. } => FunctionAssignmentNode,
            Self::Block { .. } => BlockNode,
            Self::Array { .. } => ArrayNode,
            Self::Object { .. } => ObjectNode,
            Self::Parenthesis { .. } => ParenthesisNode,
            Self::Index { .. } => IndexNode,
            Self::Accessor { .. } => AccessorNode,
            Self::Relational { .. } => RelationalNode,
        }
    }

    /// The node with all enclosing parentheses stripped
    pub fn get_content(&self) -> &Node {
        match self {
            Self::Parenthesis { content } => content.get_content(),
            _ => self,
        }
    }

    /// Node type, plus the function name for operators, e.g. `OperatorNode:add`
    pub fn get_identifier(&self) -> String {
        match self {
            Self::Operator { fn_name, .. } => format!("OperatorNode:{fn_name}"),
            _ => self.node_type().to_string(),
        }
    }

    /// The operator this node applies, if it is an operator node with a known function
    pub fn operator_fn(&self) -> Option<OperatorFn> {
        match self {
            Self::Operator { fn_name, .. } => fn_name.parse().ok(),
            _ => None,
        }
    }

    /// Name of the called function when the callee is a plain symbol
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::Function { callee, .. } => match callee.as_ref() {
                Self::Symbol { name } => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Property name of an index like `.a` or `["a"]`
    pub fn object_property(&self) -> Option<&str> {
        match self {
            Self::Index { dimensions, .. } => match dimensions.as_slice() {
                [dim] => match dim.as_ref() {
                    Self::Constant {
                        value,
                        value_type: ConstantType::String,
                    } => Some(value),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_symbol_named(&self, expected: &str) -> bool {
        matches!(self, Self::Symbol { name } if name == expected)
    }

    /// Structural equality against an optional other node, `None` is never equal
    pub fn equals(&self, other: Option<&Node>) -> bool {
        other.is_some_and(|other| self == other)
    }

    /// Copy of the whole tree, sharing nothing with `self`
    pub fn clone_deep(&self) -> Node {
        match self.try_map_children(|child, _| Ok::<_, Infallible>(Rc::new(child.clone_deep()))) {
            Ok(copy) => copy,
            Err(never) => match never {},
        }
    }
}
