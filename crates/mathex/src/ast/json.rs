//! Self-describing JSON form of expression trees.
//!
//! Every node is an object with a `"type"` key holding its [`NodeType`] name and one key
//! per slot, named in camelCase (`trueExpr`, `dotNotation`, ...). Unknown keys are ignored
//! when reading.

use std::rc::Rc;

use ordermap::OrderMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json, json};

use super::{BlockEntry, ConstantType, Node, NodeType};
use crate::error::SerializationError;

impl Node {
    pub fn to_json(&self) -> Json {
        let nodes = |items: &[Rc<Node>]| Json::Array(items.iter().map(|n| n.to_json()).collect());
        let mut fields = match self {
            Self::Constant { value, value_type } => json!({
                "value": value,
                "valueType": value_type.to_string(),
            }),
            Self::Symbol { name } => json!({ "name": name }),
            Self::Operator {
                op,
                fn_name,
                args,
                implicit,
            } => json!({
                "op": op,
                "fn": fn_name,
                "args": nodes(args),
                "implicit": implicit,
            }),
            Self::Function { callee, args } => json!({
                "fn": callee.to_json(),
                "args": nodes(args),
            }),
            Self::Range { start, end, step } => json!({
                "start": start.to_json(),
                "end": end.to_json(),
                "step": step.as_ref().map(|step| step.to_json()),
            }),
            Self::Conditional {
                condition,
                true_expr,
                false_expr,
            } => json!({
                "condition": condition.to_json(),
                "trueExpr": true_expr.to_json(),
                "falseExpr": false_expr.to_json(),
            }),
            Self::Assignment {
                object,
                index,
                value,
            } => json!({
                "object": object.to_json(),
                "index": index.as_ref().map(|index| index.to_json()),
                "value": value.to_json(),
            }),
            Self::FunctionAssignment { name, params, expr } => json!({
                "name": name,
                "params": params,
                "expr": expr.to_json(),
            }),
            Self::Block { blocks } => json!({
                "blocks": blocks
                    .iter()
                    .map(|entry| json!({ "node": entry.node.to_json(), "visible": entry.visible }))
                    .collect::<Vec<_>>(),
            }),
            Self::Array { items } => json!({ "items": nodes(items) }),
            Self::Object { properties } => json!({
                "properties": properties
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<_, _>>(),
            }),
            Self::Parenthesis { content } => json!({ "content": content.to_json() }),
            Self::Index {
                dimensions,
                dot_notation,
            } => json!({
                "dimensions": nodes(dimensions),
                "dotNotation": dot_notation,
            }),
            Self::Accessor { object, index } => json!({
                "object": object.to_json(),
                "index": index.to_json(),
            }),
            Self::Relational {
                conditionals,
                params,
            } => json!({
                "conditionals": conditionals,
                "params": nodes(params),
            }),
        };
        let mut object = Map::new();
        object.insert("type".to_owned(), json!(self.node_type().to_string()));
        if let Some(slots) = fields.as_object_mut() {
            object.append(slots);
        }
        Json::Object(object)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Rebuild a tree from its JSON form. Nodes go through the same validation as
    /// the constructor functions.
    pub fn from_json(json: &Json) -> Result<Node, SerializationError> {
        let object = json
            .as_object()
            .ok_or_else(|| SerializationError::MalformedField {
                node: "node".to_owned(),
                field: "type".to_owned(),
                expected: "an object",
            })?;
        let type_name = object
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| SerializationError::MissingField {
                node: "node".to_owned(),
                field: "type".to_owned(),
            })?;
        let node_type: NodeType =
            type_name
                .parse()
                .map_err(|_| SerializationError::UnknownNodeType {
                    type_name: type_name.to_owned(),
                })?;
        let fields = Fields {
            node: type_name,
            object,
        };

        let node = match node_type {
            NodeType::ConstantNode => {
                let value_type = fields.string("valueType")?;
                let value_type: ConstantType =
                    value_type.parse().map_err(|_| fields.malformed("valueType", "a constant type"))?;
                let value = match fields.required("value")? {
                    Json::String(s) => s.clone(),
                    Json::Number(n) if value_type == ConstantType::Number => n.to_string(),
                    _ => return Err(fields.malformed("value", "a string")),
                };
                Node::constant(value, value_type)
            }
            NodeType::SymbolNode => Node::symbol(fields.string("name")?),
            NodeType::OperatorNode => {
                let node = Node::Operator {
                    op: fields.string("op")?.to_owned(),
                    fn_name: fields.string("fn")?.to_owned(),
                    args: fields.nodes("args")?,
                    implicit: fields.flag("implicit", false)?,
                };
                node.validate()?;
                node
            }
            NodeType::FunctionNode => Node::function(fields.node("fn")?, fields.nodes("args")?),
            NodeType::RangeNode => Node::range(
                fields.node("start")?,
                fields.node("end")?,
                fields.optional_node("step")?,
            ),
            NodeType::ConditionalNode => Node::conditional(
                fields.node("condition")?,
                fields.node("trueExpr")?,
                fields.node("falseExpr")?,
            ),
            NodeType::AssignmentNode => Node::assignment(
                fields.node("object")?,
                fields.optional_node("index")?,
                fields.node("value")?,
            )?,
            NodeType::FunctionAssignmentNode => Node::function_assignment(
                fields.string("name")?,
                fields.strings("params")?,
                fields.node("expr")?,
            )?,
            NodeType::BlockNode => {
                let entries = fields.array("blocks")?;
                let blocks = entries
                    .iter()
                    .map(|entry| {
                        let entry_fields = Fields {
                            node: type_name,
                            object: entry
                                .as_object()
                                .ok_or_else(|| fields.malformed("blocks", "an array of objects"))?,
                        };
                        Ok(BlockEntry {
                            node: entry_fields.node("node")?,
                            visible: entry_fields.flag("visible", true)?,
                        })
                    })
                    .collect::<Result<_, SerializationError>>()?;
                Node::block(blocks)
            }
            NodeType::ArrayNode => Node::array(fields.nodes("items")?),
            NodeType::ObjectNode => {
                let properties = fields
                    .required("properties")?
                    .as_object()
                    .ok_or_else(|| fields.malformed("properties", "an object"))?
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), Rc::new(Node::from_json(value)?))))
                    .collect::<Result<OrderMap<_, _>, SerializationError>>()?;
                Node::object(properties)
            }
            NodeType::ParenthesisNode => Node::parenthesis(fields.node("content")?),
            NodeType::IndexNode => Node::index(
                fields.nodes("dimensions")?,
                fields.flag("dotNotation", false)?,
            )?,
            NodeType::AccessorNode => Node::accessor(fields.node("object")?, fields.node("index")?)?,
            NodeType::RelationalNode => {
                Node::relational(fields.strings("conditionals")?, fields.nodes("params")?)?
            }
        };
        Ok(node)
    }

    pub fn from_json_str(source: &str) -> Result<Node, SerializationError> {
        let json: Json = serde_json::from_str(source)?;
        Self::from_json(&json)
    }
}

struct Fields<'a> {
    node: &'a str,
    object: &'a Map<String, Json>,
}

impl<'a> Fields<'a> {
    fn malformed(&self, field: &str, expected: &'static str) -> SerializationError {
        SerializationError::MalformedField {
            node: self.node.to_owned(),
            field: field.to_owned(),
            expected,
        }
    }

    fn required(&self, field: &str) -> Result<&'a Json, SerializationError> {
        self.object
            .get(field)
            .ok_or_else(|| SerializationError::MissingField {
                node: self.node.to_owned(),
                field: field.to_owned(),
            })
    }

    fn string(&self, field: &str) -> Result<&'a str, SerializationError> {
        self.required(field)?
            .as_str()
            .ok_or_else(|| self.malformed(field, "a string"))
    }

    fn flag(&self, field: &str, default: bool) -> Result<bool, SerializationError> {
        match self.object.get(field) {
            None | Some(Json::Null) => Ok(default),
            Some(Json::Bool(b)) => Ok(*b),
            Some(_) => Err(self.malformed(field, "a boolean")),
        }
    }

    fn array(&self, field: &str) -> Result<&'a Vec<Json>, SerializationError> {
        self.required(field)?
            .as_array()
            .ok_or_else(|| self.malformed(field, "an array"))
    }

    fn strings(&self, field: &str) -> Result<Vec<String>, SerializationError> {
        self.array(field)?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| self.malformed(field, "an array of strings"))
            })
            .collect()
    }

    fn node(&self, field: &str) -> Result<Rc<Node>, SerializationError> {
        Node::from_json(self.required(field)?).map(Rc::new)
    }

    fn optional_node(&self, field: &str) -> Result<Option<Rc<Node>>, SerializationError> {
        match self.object.get(field) {
            None | Some(Json::Null) => Ok(None),
            Some(json) => Node::from_json(json).map(|node| Some(Rc::new(node))),
        }
    }

    fn nodes(&self, field: &str) -> Result<Vec<Rc<Node>>, SerializationError> {
        self.array(field)?
            .iter()
            .map(|item| Node::from_json(item).map(Rc::new))
            .collect()
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Node::from_json(&json).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;

    fn rc(node: Node) -> Rc<Node> {
        Rc::new(node)
    }

    #[test]
    fn range_node_json() {
        let node = Node::range(Node::number(0), Node::number(10), Some(rc(Node::number(2))));
        let json = node.to_json();
        assert_eq!(
            json,
            json!({
                "type": "RangeNode",
                "start": { "type": "ConstantNode", "value": "0", "valueType": "number" },
                "end": { "type": "ConstantNode", "value": "10", "valueType": "number" },
                "step": { "type": "ConstantNode", "value": "2", "valueType": "number" },
            })
        );
        assert_eq!(Node::from_json(&json), Ok(node));
    }

    #[test]
    fn missing_step_is_null() {
        let node = Node::range(Node::symbol("a"), Node::symbol("b"), None);
        assert_eq!(node.to_json()["step"], Json::Null);
        assert_eq!(Node::from_json(&node.to_json()), Ok(node));
    }

    #[test]
    fn keys_are_ordered_type_first() {
        let text = Node::symbol("x").to_json_string();
        assert_eq!(text, r#"{"type":"SymbolNode","name":"x"}"#);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = json!({ "type": "SymbolNode", "name": "x", "comment": "hi" });
        assert_eq!(Node::from_json(&json), Ok(Node::symbol("x")));
    }

    #[test]
    fn reading_errors() {
        assert_eq!(
            Node::from_json(&json!({ "type": "LambdaNode" })),
            Err(SerializationError::UnknownNodeType {
                type_name: "LambdaNode".to_owned()
            })
        );
        assert_eq!(
            Node::from_json(&json!({ "type": "RangeNode", "start": { "type": "SymbolNode", "name": "a" } })),
            Err(SerializationError::MissingField {
                node: "RangeNode".to_owned(),
                field: "end".to_owned()
            })
        );
        assert_eq!(
            Node::from_json(&json!({ "type": "SymbolNode", "name": 3 })),
            Err(SerializationError::MalformedField {
                node: "SymbolNode".to_owned(),
                field: "name".to_owned(),
                expected: "a string"
            })
        );
        assert!(matches!(
            Node::from_json_str("{\"type\":"),
            Err(SerializationError::Json(..))
        ));
    }

    #[test]
    fn reading_validates_slots() {
        let json = json!({
            "type": "AccessorNode",
            "object": { "type": "SymbolNode", "name": "a" },
            "index": { "type": "SymbolNode", "name": "b" },
        });
        assert!(matches!(
            Node::from_json(&json),
            Err(SerializationError::InvalidNode(NodeError::InvalidSlot { .. }))
        ));
    }

    #[test]
    fn serde_goes_through_the_same_format() {
        let node = Node::block(vec![BlockEntry {
            node: rc(Node::string("hi \"there\"")),
            visible: false,
        }]);
        let text = serde_json::to_string(&node).unwrap();
        assert_eq!(serde_json::from_str::<Node>(&text).unwrap(), node);
    }
}
