use itertools::Itertools;
use lazy_regex::regex_captures;
use mathex_utils::{escape_latex, fill_template, latex_function, latex_symbol};

use super::{
    Implicit, Parenthesis, StringOptions, accessor_needs_parens, associativity, content,
    is_n_ary, operator_parens, wraps_at,
};
use crate::ast::{
    ASSIGNMENT_PRECEDENCE, Associativity, ConstantType, Node, OperatorFn, RANGE_PRECEDENCE,
    RELATIONAL_PRECEDENCE,
};

fn wrap_if(s: String, wrap: bool) -> String {
    if wrap { format!("\\left({s}\\right)") } else { s }
}

/// `2.5e-3` typesets as `2.5\cdot10^{-3}`
fn number_tex(literal: &str) -> String {
    match regex_captures!(r"^([^eE]*)[eE](.+)$", literal) {
        Some((_, mantissa, exponent)) => format!("{mantissa}\\cdot10^{{{exponent}}}"),
        None => latex_symbol(literal).into_owned(),
    }
}

fn symbol_tex(name: &str) -> String {
    let symbol = latex_symbol(name);
    if symbol.starts_with('\\') {
        symbol.into_owned()
    } else {
        format!(" {symbol}")
    }
}

impl Node {
    /// LaTeX markup for the expression
    pub fn to_tex(&self, options: &StringOptions) -> String {
        if let Some(custom) = options.custom(self) {
            return custom;
        }
        let parenthesis = options.parenthesis;
        let render = |node: &Node| node.to_tex(options);

        match self {
            Self::Constant { value, value_type } => match value_type {
                ConstantType::Number => number_tex(value),
                ConstantType::String => format!("\\mathtt{{\"{}\"}}", escape_latex(value)),
                _ => latex_symbol(value).into_owned(),
            },
            Self::Symbol { name } => symbol_tex(name),
            Self::Operator {
                op,
                fn_name,
                args,
                implicit,
            } => {
                let operator_fn = self.operator_fn();
                let symbol = operator_fn.map_or(op.as_str(), |o| o.latex_symbol());
                let parens = operator_parens(self, args, *implicit, options, true);
                let operands = args
                    .iter()
                    .zip_eq(&parens)
                    .map(|(arg, wrap)| wrap_if(render(arg), *wrap))
                    .collect_vec();
                let hide_implicit = *implicit
                    && options.implicit == Implicit::Hide
                    && operator_fn == Some(OperatorFn::Multiply);

                match (operands.as_slice(), args.as_slice()) {
                    ([operand], _) => match associativity(self, parenthesis) {
                        Some(Associativity::Right) => format!("{symbol}{operand}"),
                        _ => format!("{operand}{symbol}"),
                    },
                    ([lhs, rhs], [lhs_node, _]) => match operator_fn {
                        Some(OperatorFn::Divide) => format!("{symbol}{{{lhs}}}{{{rhs}}}"),
                        Some(OperatorFn::Pow) => {
                            let base = format!("{{{lhs}}}");
                            let base = match content(lhs_node, parenthesis) {
                                Self::Conditional { .. } => wrap_if(base, true),
                                node if node.operator_fn() == Some(OperatorFn::Divide) => {
                                    wrap_if(base, true)
                                }
                                _ => base,
                            };
                            format!("{base}{symbol}{{{rhs}}}")
                        }
                        _ if hide_implicit => format!("{lhs}~{rhs}"),
                        _ => format!("{lhs}{symbol}{rhs}"),
                    },
                    ([_, _, _, ..], _) if is_n_ary(self) => {
                        operands.join(if hide_implicit { "~" } else { symbol })
                    }
                    _ => format!(
                        "\\mathrm{{{fn_name}}}\\left({}\\right)",
                        args.iter().map(|arg| render(arg)).join(",")
                    ),
                }
            }
            Self::Function { callee, args } => {
                let arg_strs = args.iter().map(|arg| render(arg)).collect_vec();
                match self.function_name() {
                    Some(name) => match latex_function(name, args.len()) {
                        Some(template) => fill_template(template, &arg_strs),
                        None => format!(
                            "\\mathrm{{{}}}\\left({}\\right)",
                            escape_latex(name),
                            arg_strs.join(",")
                        ),
                    },
                    None => format!("{}\\left({}\\right)", render(callee), arg_strs.join(",")),
                }
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
            } => format!(
                "\\begin{{cases}} {{{}}}, &\\quad{{\\text{{if }}\\;{}}}\\\\{{{}}}, &\\quad{{\\text{{otherwise}}}}\\end{{cases}}",
                render(true_expr),
                render(condition),
                render(false_expr)
            ),
            Self::Assignment {
                object,
                index,
                value,
            } => {
                let index = index.as_deref().map(render).unwrap_or_default();
                let value_tex = wrap_if(render(value), wraps_at(value, ASSIGNMENT_PRECEDENCE, parenthesis));
                format!("{}{index}:={value_tex}", render(object))
            }
            Self::FunctionAssignment { name, params, expr } => {
                let expr_tex = wrap_if(render(expr), wraps_at(expr, ASSIGNMENT_PRECEDENCE, parenthesis));
                format!(
                    "\\mathrm{{{}}}\\left({}\\right):={expr_tex}",
                    escape_latex(name),
                    params.iter().map(|param| latex_symbol(param)).join(",")
                )
            }
            Self::Block { blocks } => blocks
                .iter()
                .map(|entry| {
                    let hidden = if entry.visible { "" } else { ";" };
                    format!("{}{hidden}", render(&entry.node))
                })
                .join("\\;\\;\n"),
            Self::Array { items } => {
                let rows = items
                    .iter()
                    .map(|item| match item.as_ref() {
                        Self::Array { items: row } => row.iter().map(|cell| render(cell)).join("&"),
                        _ => render(item),
                    })
                    .map(|row| format!("{row}\\\\"))
                    .join("");
                format!("\\begin{{bmatrix}}{rows}\\end{{bmatrix}}")
            }
            Self::Object { properties } => {
                let entries = properties
                    .iter()
                    .map(|(key, value)| {
                        format!("\\mathbf{{{}:}} & {}\\\\", escape_latex(key), render(value))
                    })
                    .join("\n");
                format!("\\left\\{{\\begin{{array}}{{ll}}{entries}\\end{{array}}\\right\\}}")
            }
            Self::Parenthesis { content } => match parenthesis {
                Parenthesis::Keep => format!("\\left({}\\right)", render(content)),
                _ => render(content),
            },
            Self::Index {
                dimensions,
                dot_notation,
            } => match self.object_property() {
                Some(property) if *dot_notation => format!(".{}", escape_latex(property)),
                _ => format!("_{{{}}}", dimensions.iter().map(|dim| render(dim)).join(",")),
            },
            Self::Accessor { object, index } => format!(
                "{}{}",
                wrap_if(render(object), accessor_needs_parens(object)),
                render(index)
            ),
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
                            .map_or(conditional.as_str(), |op| op.latex_symbol());
                        format!("{acc}{symbol}{param}")
                    })
            }
        }
    }
}
