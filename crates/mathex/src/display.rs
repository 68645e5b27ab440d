use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use serde_json::Value as Json;
use strum::{Display, EnumString};

use crate::ast::{
    ASSIGNMENT_PRECEDENCE, Associativity, CONDITIONAL_PRECEDENCE, ConstantType, Node, OperatorFn,
    RANGE_PRECEDENCE, RELATIONAL_PRECEDENCE, Side,
};

mod tex;

/// When to print parentheses
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Parenthesis {
    /// Keep parentheses from the source, add only those the tree structure needs
    #[default]
    Keep,
    /// Drop source parentheses, add only those the tree structure needs
    Auto,
    /// Parenthesize every operand that is not a plain value
    All,
}

/// How implicit multiplication is printed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Implicit {
    /// `2 x`
    #[default]
    Hide,
    /// `2 * x`
    Show,
}

/// Per-node override. Returning `None` falls back to the default rendering.
pub type Handler<'a> = &'a dyn Fn(&Node, &StringOptions<'_>) -> Option<String>;

#[derive(Clone, Copy, Default)]
pub struct StringOptions<'a> {
    pub parenthesis: Parenthesis,
    pub implicit: Implicit,
    /// Consulted before the default rendering of every node
    pub handler: Option<Handler<'a>>,
}

impl<'a> StringOptions<'a> {
    pub fn with_parenthesis(mut self, parenthesis: Parenthesis) -> Self {
        self.parenthesis = parenthesis;
        self
    }

    pub fn with_implicit(mut self, implicit: Implicit) -> Self {
        self.implicit = implicit;
        self
    }

    pub fn with_handler(mut self, handler: Handler<'a>) -> Self {
        self.handler = Some(handler);
        self
    }

    fn custom(&self, node: &Node) -> Option<String> {
        self.handler.and_then(|handler| handler(node, self))
    }
}

impl fmt::Debug for StringOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringOptions")
            .field("parenthesis", &self.parenthesis)
            .field("implicit", &self.implicit)
            .field("handler", &self.handler.map(|_| "<fn>"))
            .finish()
    }
}

/// Precedence of the node as an operand, `None` for nodes that never need parentheses
fn precedence(node: &Node, parenthesis: Parenthesis) -> Option<u8> {
    let node = content(node, parenthesis);
    match node {
        Node::Assignment { .. } | Node::FunctionAssignment { .. } => Some(ASSIGNMENT_PRECEDENCE),
        Node::Conditional { .. } => Some(CONDITIONAL_PRECEDENCE),
        Node::Range { .. } => Some(RANGE_PRECEDENCE),
        Node::Relational { .. } => Some(RELATIONAL_PRECEDENCE),
        Node::Operator { .. } => node.operator_fn().map(OperatorFn::precedence),
        _ => None,
    }
}

fn associativity(node: &Node, parenthesis: Parenthesis) -> Option<Associativity> {
    match content(node, parenthesis) {
        Node::Relational { .. } => Some(Associativity::Left),
        node => node.operator_fn().map(OperatorFn::associativity),
    }
}

fn is_associative_with(root: &Node, operand: &Node, parenthesis: Parenthesis) -> bool {
    let root = content(root, parenthesis).operator_fn();
    let operand = content(operand, parenthesis).operator_fn();
    root.zip(operand)
        .is_some_and(|(root, operand)| root.associative_with().contains(&operand))
}

/// With `keep`, source parentheses are nodes of their own
fn content(node: &Node, parenthesis: Parenthesis) -> &Node {
    match parenthesis {
        Parenthesis::Keep => node,
        _ => node.get_content(),
    }
}

/// Operands that typeset without parentheses whatever surrounds them
fn typesets_bare(node: &Node, parenthesis: Parenthesis) -> bool {
    content(node, parenthesis).operator_fn() == Some(OperatorFn::Divide)
}

fn is_n_ary(root: &Node) -> bool {
    matches!(root.operator_fn(), Some(OperatorFn::Add | OperatorFn::Multiply))
}

/// Which operands of an operator node to parenthesize
fn operator_parens(
    root: &Node,
    args: &[Rc<Node>],
    implicit: bool,
    options: &StringOptions,
    latex: bool,
) -> Vec<bool> {
    let parenthesis = options.parenthesis;
    let root_fn = root.operator_fn();
    let root_precedence = precedence(root, parenthesis);
    let root_associativity = associativity(root, parenthesis);

    if parenthesis == Parenthesis::All || (args.len() > 2 && !is_n_ary(root)) {
        return args
            .iter()
            .map(|arg| {
                !matches!(
                    arg.get_content(),
                    Node::Array { .. } | Node::Constant { .. } | Node::Symbol { .. }
                )
            })
            .collect();
    }

    let binds_looser = |arg: &Node, assoc: Associativity| {
        precedence(arg, parenthesis)
            .zip(root_precedence)
            .is_some_and(|(arg_precedence, precedence)| {
                arg_precedence < precedence
                    || (arg_precedence == precedence
                        && root_associativity == Some(assoc)
                        && !is_associative_with(root, arg, parenthesis))
            })
    };
    let latex_bare = |arg: &Node, side: Side| {
        latex
            && precedence(arg, parenthesis).is_some()
            && (root_fn.is_some_and(|op| op.latex_omits_parens(side))
                || typesets_bare(arg, parenthesis))
    };

    let mut parens = match args {
        [operand] => {
            let wrap = precedence(operand, parenthesis)
                .zip(root_precedence)
                .is_some_and(|(operand_precedence, precedence)| operand_precedence <= precedence);
            vec![wrap && !latex_bare(operand, Side::Left)]
        }
        [lhs, rhs] => vec![
            binds_looser(lhs, Associativity::Right) && !latex_bare(lhs, Side::Left),
            binds_looser(rhs, Associativity::Left) && !latex_bare(rhs, Side::Right),
        ],
        _ => args
            .iter()
            .map(|arg| {
                precedence(arg, parenthesis)
                    .zip(root_precedence)
                    .is_some_and(|(arg_precedence, precedence)| {
                        arg_precedence < precedence
                            || (arg_precedence == precedence
                                && root_associativity == associativity(arg, parenthesis)
                                && !is_associative_with(root, arg, parenthesis))
                    })
            })
            .collect(),
    };

    if args.len() >= 2
        && implicit
        && root_fn == Some(OperatorFn::Multiply)
        && parenthesis == Parenthesis::Auto
        && options.implicit == Implicit::Hide
    {
        for (wrap, arg) in parens.iter_mut().zip_eq(args) {
            *wrap |= matches!(arg.as_ref(), Node::Parenthesis { .. });
        }
    }
    parens
}

/// Parenthesize a child whose precedence is at most `precedence`
fn wraps_at(node: &Node, precedence: u8, parenthesis: Parenthesis) -> bool {
    parenthesis == Parenthesis::All
        || self::precedence(node, parenthesis).is_some_and(|p| p <= precedence)
}

/// Accessed objects other than these are parenthesized, as in `(a + b)[1]`
fn accessor_needs_parens(object: &Node) -> bool {
    !matches!(
        object,
        Node::Accessor { .. }
            | Node::Array { .. }
            | Node::Constant { .. }
            | Node::Function { .. }
            | Node::Object { .. }
            | Node::Parenthesis { .. }
            | Node::Symbol { .. }
    )
}

fn wrap_if(s: String, wrap: bool) -> String {
    if wrap { format!("({s})") } else { s }
}

fn quote(s: &str) -> String {
    Json::String(s.to_owned()).to_string()
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_opts(&StringOptions::default()))
    }
}

impl Node {
    pub fn to_string_opts(&self, options: &StringOptions) -> String {
        if let Some(custom) = options.custom(self) {
            return custom;
        }
        let parenthesis = options.parenthesis;
        let render = |node: &Node| node.to_string_opts(options);

        match self {
            Self::Constant { value, value_type } => match value_type {
                ConstantType::String => quote(value),
                _ => value.clone(),
            },
            Self::Symbol { name } => name.clone(),
            Self::Operator {
                op,
                fn_name,
                args,
                implicit,
            } => {
                let parens = operator_parens(self, args, *implicit, options, false);
                let operands = args
                    .iter()
                    .zip_eq(&parens)
                    .map(|(arg, wrap)| wrap_if(render(arg), *wrap))
                    .collect_vec();
                let hide_implicit = *implicit
                    && options.implicit == Implicit::Hide
                    && self.operator_fn() == Some(OperatorFn::Multiply);

                match operands.as_slice() {
                    [operand] => {
                        let spacer = if op.chars().any(char::is_alphabetic) { " " } else { "" };
                        match associativity(self, parenthesis) {
                            Some(Associativity::Right) => format!("{op}{spacer}{operand}"),
                            Some(Associativity::Left) => format!("{operand}{spacer}{op}"),
                            None => format!("{operand}{op}"),
                        }
                    }
                    [lhs, rhs] if hide_implicit => format!("{lhs} {rhs}"),
                    [lhs, rhs] => format!("{lhs} {op} {rhs}"),
                    [_, _, _, ..] if hide_implicit => operands.join(" "),
                    [_, _, _, ..] if is_n_ary(self) => operands.join(&format!(" {op} ")),
                    _ => format!("{fn_name}({})", args.iter().map(|arg| render(arg)).join(", ")),
                }
            }
            Self::Function { callee, args } => {
                let callee_str = match callee.as_ref() {
                    Self::Symbol { .. }
                    | Self::Accessor { .. }
                    | Self::Function { .. }
                    | Self::Parenthesis { .. } => render(callee),
                    _ => format!("({})", render(callee)),
                };
                format!("{callee_str}({})", args.iter().map(|arg| render(arg)).join(", "))
            }
            Self::Range { start, end, step } => {
                let part = |node: &Node| wrap_if(render(node), wraps_at(node, RANGE_PRECEDENCE, parenthesis));
                match step {
                    Some(step) => format!("{}:{}:{}", part(start), part(step), part(end)),
                    None => format!("{}:{}", part(start), part(end)),
                }
            }
            Self::Conditional {
                condition,
                true_expr,
                false_expr,
            } => {
                let wrap_condition = matches!(condition.as_ref(), Self::Operator { .. })
                    || wraps_at(condition, CONDITIONAL_PRECEDENCE, parenthesis);
                let branch = |node: &Node| {
                    wrap_if(render(node), wraps_at(node, CONDITIONAL_PRECEDENCE, parenthesis))
                };
                format!(
                    "{} ? {} : {}",
                    wrap_if(render(condition), wrap_condition),
                    branch(true_expr),
                    branch(false_expr)
                )
            }
            Self::Assignment {
                object,
                index,
                value,
            } => {
                let index = index.as_deref().map(render).unwrap_or_default();
                let value_str = wrap_if(render(value), wraps_at(value, ASSIGNMENT_PRECEDENCE, parenthesis));
                format!("{}{index} = {value_str}", render(object))
            }
            Self::FunctionAssignment { name, params, expr } => {
                let expr_str = wrap_if(render(expr), wraps_at(expr, ASSIGNMENT_PRECEDENCE, parenthesis));
                format!("{name}({}) = {expr_str}", params.join(", "))
            }
            Self::Block { blocks } => blocks
                .iter()
                .map(|entry| {
                    let hidden = if entry.visible { "" } else { ";" };
                    format!("{}{hidden}", render(&entry.node))
                })
                .join("\n"),
            Self::Array { items } => format!("[{}]", items.iter().map(|item| render(item)).join(", ")),
            Self::Object { properties } => format!(
                "{{{}}}",
                properties
                    .iter()
                    .map(|(key, value)| format!("{}: {}", quote(key), render(value)))
                    .join(", ")
            ),
            Self::Parenthesis { content } => match parenthesis {
                Parenthesis::Keep => format!("({})", render(content)),
                _ => render(content),
            },
            Self::Index {
                dimensions,
                dot_notation,
            } => match self.object_property() {
                Some(property) if *dot_notation => format!(".{property}"),
                _ => format!("[{}]", dimensions.iter().map(|dim| render(dim)).join(", ")),
            },
            Self::Accessor { object, index } => {
                format!(
                    "{}{}",
                    wrap_if(render(object), accessor_needs_parens(object)),
                    render(index)
                )
            }
            Self::Relational {
                conditionals,
                params,
            } => {
                let mut params = params.iter().map(|param| {
                    wrap_if(render(param), wraps_at(param, RELATIONAL_PRECEDENCE, parenthesis))
                });
                let first = params.next().unwrap_or_default();
                conditionals
                    .iter()
                    .zip_eq(params)
                    .fold(first, |acc, (conditional, param)| {
                        let symbol = conditional
                            .parse::<OperatorFn>()
                            .map_or(conditional.as_str(), |op| op.symbol());
                        format!("{acc} {symbol} {param}")
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn rc(node: Node) -> Rc<Node> {
        Rc::new(node)
    }

    fn op(op: OperatorFn, args: Vec<Node>) -> Node {
        Node::op(op, args.into_iter().map(Rc::new).collect()).unwrap()
    }

    fn show(source: &str) -> String {
        parse(source).unwrap().to_string()
    }

    fn show_with(source: &str, options: &StringOptions) -> String {
        parse(source).unwrap().to_string_opts(options)
    }

    #[test]
    fn options_parse_from_strings() {
        assert_eq!("auto".parse::<Parenthesis>().ok(), Some(Parenthesis::Auto));
        assert_eq!("show".parse::<Implicit>().ok(), Some(Implicit::Show));
        assert_eq!(Parenthesis::default().to_string(), "keep");
        assert!("sometimes".parse::<Parenthesis>().is_err());
    }

    #[test]
    fn ranges() {
        assert_eq!(Node::range(Node::number(0), Node::number(10), None).to_string(), "0:10");
        assert_eq!(
            Node::range(Node::number(0), Node::number(10), Some(rc(Node::number(2)))).to_string(),
            "0:2:10"
        );
        let inner = Node::range(Node::number(0), Node::number(10), None);
        assert_eq!(
            Node::range(inner, Node::number(100), Some(rc(Node::number(2)))).to_string(),
            "(0:10):2:100"
        );
        let all = StringOptions::default().with_parenthesis(Parenthesis::All);
        assert_eq!(show_with("1:2:3", &all), "(1):(2):(3)");
    }

    #[test]
    fn range_with_operator_bounds() {
        let sum = op(OperatorFn::Add, vec![Node::number(1), Node::number(2)]);
        let less = op(OperatorFn::Smaller, vec![Node::number(1), Node::number(2)]);
        let range = Node::range(sum.clone(), sum, Some(rc(less)));
        assert_eq!(range.to_string(), "1 + 2:1 < 2:1 + 2");
    }

    #[test]
    fn binary_operators() {
        assert_eq!(show("1 + 2 * 3"), "1 + 2 * 3");
        assert_eq!(
            op(OperatorFn::Multiply, vec![op(OperatorFn::Add, vec![Node::number(1), Node::number(2)]), Node::number(3)])
                .to_string(),
            "(1 + 2) * 3"
        );
        let nested = |outer, inner| {
            op(outer, vec![Node::symbol("a"), op(inner, vec![Node::symbol("b"), Node::symbol("c")])])
        };
        assert_eq!(nested(OperatorFn::Subtract, OperatorFn::Subtract).to_string(), "a - (b - c)");
        assert_eq!(nested(OperatorFn::Add, OperatorFn::Subtract).to_string(), "a + b - c");
        assert_eq!(nested(OperatorFn::Divide, OperatorFn::Multiply).to_string(), "a / (b * c)");
        assert_eq!(show("2^3^4"), "2 ^ 3 ^ 4");
        assert_eq!(
            op(OperatorFn::Pow, vec![op(OperatorFn::Pow, vec![Node::number(2), Node::number(3)]), Node::number(4)])
                .to_string(),
            "(2 ^ 3) ^ 4"
        );
        assert_eq!(show("7 % 2"), "7 % 2");
        assert_eq!(show("7 mod 2"), "7 mod 2");
    }

    #[test]
    fn unary_operators() {
        assert_eq!(show("-x"), "-x");
        assert_eq!(show("not x"), "not x");
        assert_eq!(show("3!"), "3!");
        assert_eq!(show("a'"), "a'");
        assert_eq!(
            op(OperatorFn::UnaryMinus, vec![op(OperatorFn::Add, vec![Node::symbol("x"), Node::number(1)])])
                .to_string(),
            "-(x + 1)"
        );
        assert_eq!(show("-2^2"), "-2 ^ 2");
    }

    #[test]
    fn n_ary_operators() {
        let args = vec![rc(Node::symbol("a")), rc(Node::symbol("b")), rc(Node::symbol("c"))];
        let sum = Node::op(OperatorFn::Add, args.clone()).unwrap();
        assert_eq!(sum.to_string(), "a + b + c");
        let other = Node::operator("&", "bitAnd", args).unwrap();
        assert_eq!(other.to_string(), "bitAnd(a, b, c)");
    }

    #[test]
    fn parenthesis_modes() {
        let keep = StringOptions::default();
        let auto = keep.with_parenthesis(Parenthesis::Auto);
        let all = keep.with_parenthesis(Parenthesis::All);
        assert_eq!(show_with("(1 * 2) + 3", &keep), "(1 * 2) + 3");
        assert_eq!(show_with("(1 * 2) + 3", &auto), "1 * 2 + 3");
        assert_eq!(show_with("((1 + 2)) * 3", &auto), "(1 + 2) * 3");
        assert_eq!(show_with("1 + 2 * 3", &all), "1 + (2 * 3)");
        assert_eq!(show_with("2 (x)", &auto), "2 (x)");
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(show("2x"), "2 x");
        let shown = StringOptions::default().with_implicit(Implicit::Show);
        assert_eq!(show_with("2x", &shown), "2 * x");
    }

    #[test]
    fn other_nodes() {
        assert_eq!(show("a > b ? a : b"), "(a > b) ? a : b");
        assert_eq!(show("f(x, y) = x + y"), "f(x, y) = x + y");
        assert_eq!(show("sqrt(4)"), "sqrt(4)");
        assert_eq!(show("a.b[2] = 3"), "a.b[2] = 3");
        assert_eq!(show("a.b[2]"), "a.b[2]");
        assert_eq!(show("(a + b)[1]"), "(a + b)[1]");
        assert_eq!(show("[1, 2; 3, 4]"), "[[1, 2], [3, 4]]");
        assert_eq!(show("{a: 1, \"b c\": \"x\"}"), "{\"a\": 1, \"b c\": \"x\"}");
        assert_eq!(show("a = 1; b = 2\na + b"), "a = 1;\nb = 2\na + b");
        assert_eq!(show("a < b <= c"), "a < b <= c");
        assert_eq!(show("\"say \\\"hi\\\"\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn accessor_of_built_operator_is_parenthesized() {
        let sum = op(OperatorFn::Add, vec![Node::symbol("a"), Node::symbol("b")]);
        let node = Node::accessor(sum, Node::index(vec![rc(Node::number(1))], false).unwrap()).unwrap();
        assert_eq!(node.to_string(), "(a + b)[1]");
    }

    #[test]
    fn handler_overrides_nodes() {
        let handler = |node: &Node, options: &StringOptions<'_>| match node {
            Node::Range {
                start,
                end,
                step: Some(step),
            } => Some(format!(
                "from {} to {} with steps of {}",
                start.to_string_opts(options),
                end.to_string_opts(options),
                step.to_string_opts(options)
            )),
            Node::Constant { value, value_type } => Some(format!("const({value}, {value_type})")),
            _ => None,
        };
        let options = StringOptions::default().with_handler(&handler);
        let range = Node::range(Node::number(1), Node::number(2), Some(rc(Node::number(3))));
        assert_eq!(
            range.to_string_opts(&options),
            "from const(1, number) to const(2, number) with steps of const(3, number)"
        );
        assert_eq!(
            show_with("x + 1", &options),
            "x + const(1, number)"
        );
    }
}
