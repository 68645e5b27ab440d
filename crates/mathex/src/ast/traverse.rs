use std::rc::Rc;

use ordermap::OrderMap;

use super::{BlockEntry, Node};
use crate::error::NodeError;

fn list_paths<'a>(slot: &str, items: &'a [Rc<Node>]) -> impl Iterator<Item = (String, &'a Rc<Node>)> {
    items
        .iter()
        .enumerate()
        .map(move |(i, item)| (format!("{slot}[{i}]"), item))
}

fn named<'a>(slots: Vec<(&str, &'a Rc<Node>)>) -> Vec<(String, &'a Rc<Node>)> {
    slots
        .into_iter()
        .map(|(path, node)| (path.to_owned(), node))
        .collect()
}

fn property_path(key: &str) -> String {
    format!("properties[{key:?}]")
}

fn try_map_list<E>(
    slot: &str,
    items: &[Rc<Node>],
    f: &mut impl FnMut(&Rc<Node>, &str) -> Result<Rc<Node>, E>,
) -> Result<Vec<Rc<Node>>, E> {
    list_paths(slot, items)
        .map(|(path, item)| f(item, &path))
        .collect()
}

impl Node {
    /// Immediate children in slot order, each with its path relative to `self`:
    /// `args[1]`, `blocks[0].node`, `properties["a"]`, `trueExpr`, ...
    pub fn children(&self) -> Vec<(String, &Rc<Node>)> {
        match self {
            Self::Constant { .. } | Self::Symbol { .. } => vec![],
            Self::Operator { args, .. } => list_paths("args", args).collect(),
            Self::Function { callee, args } => named(vec![("fn", callee)])
                .into_iter()
                .chain(list_paths("args", args))
                .collect(),
            Self::Range { start, end, step } => {
                let mut slots = named(vec![("start", start), ("end", end)]);
                if let Some(step) = step {
                    slots.push(("step".to_owned(), step));
                }
                slots
            }
            Self::Conditional {
                condition,
                true_expr,
                false_expr,
            } => named(vec![
                ("condition", condition),
                ("trueExpr", true_expr),
                ("falseExpr", false_expr),
            ]),
            Self::Assignment {
                object,
                index,
                value,
            } => {
                let mut slots = named(vec![("object", object)]);
                if let Some(index) = index {
                    slots.push(("index".to_owned(), index));
                }
                slots.push(("value".to_owned(), value));
                slots
            }
            Self::FunctionAssignment { expr, .. } => named(vec![("expr", expr)]),
            Self::Block { blocks } => blocks
                .iter()
                .enumerate()
                .map(|(i, entry)| (format!("blocks[{i}].node"), &entry.node))
                .collect(),
            Self::Array { items } => list_paths("items", items).collect(),
            Self::Object { properties } => properties
                .iter()
                .map(|(key, value)| (property_path(key), value))
                .collect(),
            Self::Parenthesis { content } => named(vec![("content", content)]),
            Self::Index { dimensions, .. } => list_paths("dimensions", dimensions).collect(),
            Self::Accessor { object, index } => named(vec![("object", object), ("index", index)]),
            Self::Relational { params, .. } => list_paths("params", params).collect(),
        }
    }

    /// Rebuild this node with every child replaced by `f(child, path)`.
    /// The result is not validated.
    pub(crate) fn try_map_children<E>(
        &self,
        mut f: impl FnMut(&Rc<Node>, &str) -> Result<Rc<Node>, E>,
    ) -> Result<Node, E> {
        Ok(match self {
            Self::Constant { .. } | Self::Symbol { .. } => self.clone(),
            Self::Operator {
                op,
                fn_name,
                args,
                implicit,
            } => Self::Operator {
                op: op.clone(),
                fn_name: fn_name.clone(),
                args: try_map_list("args", args, &mut f)?,
                implicit: *implicit,
            },
            Self::Function { callee, args } => Self::Function {
                callee: f(callee, "fn")?,
                args: try_map_list("args", args, &mut f)?,
            },
            Self::Range { start, end, step } => Self::Range {
                start: f(start, "start")?,
                end: f(end, "end")?,
                step: step.as_ref().map(|step| f(step, "step")).transpose()?,
            },
            Self::Conditional {
                condition,
                true_expr,
                false_expr,
            } => Self::Conditional {
                condition: f(condition, "condition")?,
                true_expr: f(true_expr, "trueExpr")?,
                false_expr: f(false_expr, "falseExpr")?,
            },
            Self::Assignment {
                object,
                index,
                value,
            } => Self::Assignment {
                object: f(object, "object")?,
                index: index.as_ref().map(|index| f(index, "index")).transpose()?,
                value: f(value, "value")?,
            },
            Self::FunctionAssignment { name, params, expr } => Self::FunctionAssignment {
                name: name.clone(),
                params: params.clone(),
                expr: f(expr, "expr")?,
            },
            Self::Block { blocks } => Self::Block {
                blocks: blocks
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| {
                        Ok(BlockEntry {
                            node: f(&entry.node, &format!("blocks[{i}].node"))?,
                            visible: entry.visible,
                        })
                    })
                    .collect::<Result<_, E>>()?,
            },
            Self::Array { items } => Self::Array {
                items: try_map_list("items", items, &mut f)?,
            },
            Self::Object { properties } => Self::Object {
                properties: properties
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), f(value, &property_path(key))?)))
                    .collect::<Result<OrderMap<_, _>, E>>()?,
            },
            Self::Parenthesis { content } => Self::Parenthesis {
                content: f(content, "content")?,
            },
            Self::Index {
                dimensions,
                dot_notation,
            } => Self::Index {
                dimensions: try_map_list("dimensions", dimensions, &mut f)?,
                dot_notation: *dot_notation,
            },
            Self::Accessor { object, index } => Self::Accessor {
                object: f(object, "object")?,
                index: f(index, "index")?,
            },
            Self::Relational {
                conditionals,
                params,
            } => Self::Relational {
                conditionals: conditionals.clone(),
                params: try_map_list("params", params, &mut f)?,
            },
        })
    }

    /// Call `f(child, path, self)` for each immediate child. Does not recurse.
    pub fn for_each(&self, mut f: impl FnMut(&Rc<Node>, &str, &Node)) {
        for (path, child) in self.children() {
            f(child, &path, self);
        }
    }

    /// New node whose children are `f(child, path, self)`. Children `f` hands back
    /// unchanged stay shared with `self`. Does not recurse.
    pub fn map(
        &self,
        mut f: impl FnMut(&Rc<Node>, &str, &Node) -> Rc<Node>,
    ) -> Result<Node, NodeError> {
        let mapped = self.try_map_children(|child, path| Ok::<_, NodeError>(f(child, path, self)))?;
        mapped.validate()?;
        Ok(mapped)
    }

    /// Depth-first rewrite starting at `self`. `f(node, path, parent)` is called on every
    /// node before its children (the root gets path `""` and no parent); when it returns
    /// a different node that node is used as is and not descended into. Subtrees without
    /// replacements are shared with the original, an untouched tree comes back as `self`.
    pub fn transform(
        self: &Rc<Self>,
        mut f: impl FnMut(&Rc<Node>, &str, Option<&Node>) -> Rc<Node>,
    ) -> Result<Rc<Node>, NodeError> {
        transform_node(self, "", None, &mut f)
    }

    /// Pre-order visit of the whole tree including `self`, which gets path `""` and
    /// no parent
    pub fn traverse<'a>(&'a self, mut f: impl FnMut(&'a Node, &str, Option<&'a Node>)) {
        f(self, "", None);
        traverse_children(self, &mut f);
    }

    /// Every node of the tree, `self` included, that satisfies `predicate`, in pre-order
    pub fn filter<'a>(
        &'a self,
        mut predicate: impl FnMut(&'a Node, &str, Option<&'a Node>) -> bool,
    ) -> Vec<&'a Node> {
        let mut found = Vec::new();
        self.traverse(|node, path, parent| {
            if predicate(node, path, parent) {
                found.push(node);
            }
        });
        found
    }
}

fn transform_node<F>(
    node: &Rc<Node>,
    path: &str,
    parent: Option<&Node>,
    f: &mut F,
) -> Result<Rc<Node>, NodeError>
where
    F: FnMut(&Rc<Node>, &str, Option<&Node>) -> Rc<Node>,
{
    let replacement = f(node, path, parent);
    if !Rc::ptr_eq(&replacement, node) {
        return Ok(replacement);
    }
    let mut changed = false;
    let rebuilt = node.try_map_children(|child, child_path| {
        let result = transform_node(child, child_path, Some(node), f)?;
        changed |= !Rc::ptr_eq(&result, child);
        Ok::<_, NodeError>(result)
    })?;
    if !changed {
        return Ok(Rc::clone(node));
    }
    rebuilt.validate()?;
    Ok(Rc::new(rebuilt))
}

fn traverse_children<'a, F>(node: &'a Node, f: &mut F)
where
    F: FnMut(&'a Node, &str, Option<&'a Node>),
{
    for (path, child) in node.children() {
        f(child, &path, Some(node));
        traverse_children(child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ConstantType, OperatorFn};

    fn rc(node: Node) -> Rc<Node> {
        Rc::new(node)
    }

    fn range_with_step() -> Rc<Node> {
        rc(Node::range(Node::number(0), Node::symbol("x"), Some(rc(Node::number(2)))))
    }

    #[test]
    fn for_each_visits_slots_in_order() {
        let node = range_with_step();
        let mut seen = vec![];
        node.for_each(|child, path, parent| {
            assert!(std::ptr::eq(parent, node.as_ref()));
            seen.push((path.to_owned(), child.to_string()));
        });
        assert_eq!(
            seen,
            vec![
                ("start".to_owned(), "0".to_owned()),
                ("end".to_owned(), "x".to_owned()),
                ("step".to_owned(), "2".to_owned()),
            ]
        );
    }

    #[test]
    fn paths_of_composite_slots() {
        let object = Node::object(
            [("a".to_owned(), rc(Node::number(1)))].into_iter().collect(),
        );
        assert_eq!(object.children()[0].0, "properties[\"a\"]");

        let block = Node::block(vec![
            BlockEntry { node: rc(Node::number(1)), visible: false },
            BlockEntry { node: rc(Node::number(2)), visible: true },
        ]);
        let paths: Vec<String> = block.children().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["blocks[0].node", "blocks[1].node"]);

        let call = Node::call("f", vec![rc(Node::symbol("x"))]);
        let paths: Vec<String> = call.children().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["fn", "args[0]"]);
    }

    #[test]
    fn map_replaces_children_and_shares_the_rest() {
        let node = range_with_step();
        let mapped = node
            .map(|child, path, _| {
                if path == "end" {
                    rc(Node::number(10))
                } else {
                    Rc::clone(child)
                }
            })
            .unwrap();
        assert_eq!(mapped.to_string(), "0:2:10");
        assert_eq!(node.to_string(), "0:2:x");

        let (Node::Range { start: a, .. }, Node::Range { start: b, .. }) = (node.as_ref(), &mapped)
        else {
            panic!("expected ranges");
        };
        assert!(Rc::ptr_eq(a, b));
    }

    #[test]
    fn map_validates_the_result() {
        let accessor = Node::accessor(Node::symbol("a"), Node::property_index("b")).unwrap();
        let result = accessor.map(|child, path, _| {
            if path == "index" {
                rc(Node::number(1))
            } else {
                Rc::clone(child)
            }
        });
        assert!(matches!(result, Err(NodeError::InvalidSlot { .. })));
    }

    #[test]
    fn transform_replaces_matching_nodes() {
        let node = range_with_step();
        let transformed = node
            .transform(|n, _, _| {
                if n.is_symbol_named("x") {
                    rc(Node::number(3))
                } else {
                    Rc::clone(n)
                }
            })
            .unwrap();
        assert_eq!(transformed.to_string(), "0:2:3");
        assert_eq!(node.to_string(), "0:2:x");
    }

    #[test]
    fn transform_does_not_descend_into_replacements() {
        let node = rc(Node::op(
            OperatorFn::Add,
            vec![rc(Node::symbol("x")), rc(Node::number(1))],
        )
        .unwrap());
        let mut visited = 0;
        let transformed = node
            .transform(|n, _, _| {
                visited += 1;
                if n.is_symbol_named("x") {
                    rc(Node::op(OperatorFn::Add, vec![rc(Node::symbol("x")), rc(Node::number(1))]).unwrap())
                } else {
                    Rc::clone(n)
                }
            })
            .unwrap();
        assert_eq!(transformed.to_string(), "x + 1 + 1");
        assert_eq!(visited, 3);
    }

    #[test]
    fn untouched_transform_returns_the_same_tree() {
        let node = range_with_step();
        let same = node.transform(|n, _, _| Rc::clone(n)).unwrap();
        assert!(Rc::ptr_eq(&node, &same));
    }

    #[test]
    fn transform_can_replace_the_root() {
        let node = range_with_step();
        let replaced = node.transform(|_, _, _| rc(Node::symbol("y"))).unwrap();
        assert_eq!(replaced.as_ref(), &Node::symbol("y"));
    }

    #[test]
    fn traverse_is_pre_order() {
        let node = range_with_step();
        let mut order = vec![];
        node.traverse(|n, path, parent| {
            order.push((n.node_type().to_string(), path.to_owned(), parent.is_some()));
        });
        assert_eq!(
            order,
            vec![
                ("RangeNode".to_owned(), String::new(), false),
                ("ConstantNode".to_owned(), "start".to_owned(), true),
                ("SymbolNode".to_owned(), "end".to_owned(), true),
                ("ConstantNode".to_owned(), "step".to_owned(), true),
            ]
        );
    }

    #[test]
    fn filter_collects_matches() {
        let node = range_with_step();
        assert_eq!(node.filter(|n, _, _| matches!(n, Node::Range { .. })).len(), 1);
        assert_eq!(node.filter(|n, _, _| matches!(n, Node::Symbol { .. })).len(), 1);
        let twos = node.filter(|n, _, _| {
            matches!(n, Node::Constant { value, value_type: ConstantType::Number } if value == "2")
        });
        assert_eq!(twos, vec![&Node::number(2)]);
    }
}
