use std::rc::Rc;

use ordermap::OrderMap;

use crate::ast::{BlockEntry, ConstantType, Node, binary_from_symbol, postfix_from_symbol, prefix_from_symbol};
use crate::error::{NodeError, SyntaxError};
use crate::lex::{NAMED_OPERATORS, Token, TokenKind, tokenize};
use crate::trace::trace;

type ParseResult<T> = Result<T, SyntaxError>;

const RELATIONAL_OPERATORS: [&str; 6] = ["==", "!=", "<", ">", "<=", ">="];
const MULTIPLICATIVE_OPERATORS: [&str; 6] = ["*", "/", ".*", "./", "%", "mod"];

/// Parse an expression, or several separated by newlines or `;`, into a tree.
///
/// An empty source parses to an `undefined` constant.
pub fn parse(source: &str) -> ParseResult<Node> {
    let mut state = ParseState::new(tokenize(source));
    let node = state.parse_start()?;
    trace!("parsed {source:?} into a {}", node.node_type());
    Ok(node)
}

/// Deepest nesting of brackets and prefix operators the parser accepts
const MAX_DEPTH: usize = 100;

struct ParseState {
    tokens: Vec<Token>,
    index: usize,
    /// Depth of open brackets, newlines are insignificant while it is positive
    nesting_level: usize,
    /// Nesting level of the innermost `?` whose `:` is still pending
    conditional_level: Option<usize>,
    /// Operands currently being parsed inside one another
    depth: usize,
}

impl ParseState {
    fn new(tokens: Vec<Token>) -> Self {
        let mut state = Self {
            tokens,
            index: 0,
            nesting_level: 0,
            conditional_level: None,
            depth: 0,
        };
        if state.tokens.last().is_none_or(|t| t.kind != TokenKind::End) {
            let position = state.tokens.last().map_or(0, |t| t.position + t.text.chars().count());
            state.tokens.push(Token {
                kind: TokenKind::End,
                text: String::new(),
                position,
            });
        }
        state
    }

    fn token(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn at_end(&self) -> bool {
        self.token().kind == TokenKind::End
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.index += 1;
        }
        while self.nesting_level > 0 && self.token().kind == TokenKind::Newline {
            self.index += 1;
        }
    }

    fn advance_skip_newline(&mut self) {
        self.advance();
        while self.token().kind == TokenKind::Newline {
            self.index += 1;
        }
    }

    fn open_params(&mut self) {
        self.nesting_level += 1;
        self.advance();
    }

    fn close_params(&mut self) {
        self.nesting_level = self.nesting_level.saturating_sub(1);
        self.advance();
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.token().position)
    }

    fn node_error(&self, err: &NodeError) -> SyntaxError {
        self.error(err.to_string())
    }

    fn unknown_token_error(&self) -> SyntaxError {
        let text = &self.token().text;
        if text.starts_with('"') {
            self.error("End of string \" expected")
        } else {
            self.error(format!("Syntax error in part \"{text}\""))
        }
    }

    /// Text of the current token if it is one of `ops`
    fn operator_in(&self, ops: &[&str]) -> Option<String> {
        let token = self.token();
        (token.kind == TokenKind::Operator && ops.contains(&token.text.as_str()))
            .then(|| token.text.clone())
    }

    fn in_conditional(&self) -> bool {
        self.conditional_level == Some(self.nesting_level)
    }

    fn binary(&self, op: &str, args: Vec<Node>) -> ParseResult<Node> {
        let Some(fn_name) = binary_from_symbol(op) else {
            return Err(self.error(format!("Unexpected operator {op}")));
        };
        Node::operator(op, fn_name.to_string(), args.into_iter().map(Rc::new).collect())
            .map_err(|err| self.node_error(&err))
    }

    fn parse_start(&mut self) -> ParseResult<Node> {
        let node = self.parse_block()?;
        let token = self.token();
        match token.kind {
            TokenKind::End => Ok(node),
            TokenKind::Unknown => Err(self.unknown_token_error()),
            TokenKind::Operator | TokenKind::Delimiter => {
                Err(self.error(format!("Unexpected operator {}", token.text)))
            }
            _ => Err(self.error(format!("Unexpected \"{}\"", token.text))),
        }
    }

    /// Expressions separated by newlines (result shown) or `;` (result hidden)
    fn parse_block(&mut self) -> ParseResult<Node> {
        let is_separator = |token: &Token| token.kind == TokenKind::Newline || token.is_delimiter(";");

        let mut node = None;
        if !self.at_end() && !is_separator(self.token()) {
            node = Some(self.parse_assignment()?);
        }

        let mut blocks = Vec::new();
        while is_separator(self.token()) {
            if blocks.is_empty()
                && let Some(first) = node.take()
            {
                blocks.push(BlockEntry {
                    node: Rc::new(first),
                    visible: !self.token().is_delimiter(";"),
                });
            }
            self.advance();
            if !self.at_end() && !is_separator(self.token()) {
                let entry = self.parse_assignment()?;
                blocks.push(BlockEntry {
                    node: Rc::new(entry),
                    visible: !self.token().is_delimiter(";"),
                });
            }
        }

        if blocks.is_empty() {
            Ok(node.unwrap_or_else(Node::undefined))
        } else {
            Ok(Node::block(blocks))
        }
    }

    fn parse_assignment(&mut self) -> ParseResult<Node> {
        let target = self.parse_conditional()?;
        if !self.token().is_operator("=") {
            return Ok(target);
        }
        let position = self.token().position;
        let invalid = || SyntaxError::new("Invalid left hand side of assignment operator =", position);
        self.advance_skip_newline();
        let value = self.parse_assignment()?;

        let assignment = match target {
            Node::Symbol { .. } => Node::assignment(target, None, value),
            Node::Accessor { object, index } => Node::assignment(object, Some(index), value),
            Node::Function { callee, args } => {
                let params = args
                    .iter()
                    .map(|arg| match arg.as_ref() {
                        Node::Symbol { name } => Some(name.clone()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>();
                match (callee.as_ref(), params) {
                    (Node::Symbol { name }, Some(params)) => {
                        Node::function_assignment(name.clone(), params, value)
                    }
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(invalid()),
        };
        assignment.map_err(|err| SyntaxError::new(err.to_string(), position))
    }

    fn parse_conditional(&mut self) -> ParseResult<Node> {
        let mut node = self.parse_range()?;
        while self.token().is_operator("?") {
            let outer_level = self.conditional_level;
            self.conditional_level = Some(self.nesting_level);
            self.advance_skip_newline();
            let true_expr = self.parse_assignment()?;
            if !self.token().is_operator(":") {
                return Err(self.error("False part of conditional expression expected"));
            }
            self.conditional_level = None;
            self.advance_skip_newline();
            let false_expr = self.parse_assignment()?;
            node = Node::conditional(node, true_expr, false_expr);
            self.conditional_level = outer_level;
        }
        Ok(node)
    }

    /// `start:end` or `start:step:end`, with `1` and `end` filling in omitted bounds
    fn parse_range(&mut self) -> ParseResult<Node> {
        let mut params = Vec::with_capacity(3);
        if self.token().is_operator(":") && !self.in_conditional() {
            params.push(Node::number(1));
        } else {
            params.push(self.parse_or()?);
        }

        while self.token().is_operator(":") && !self.in_conditional() {
            if params.len() == 3 {
                return Err(self.error("too many range parts"));
            }
            self.advance();
            if self.at_range_bound() {
                params.push(Node::symbol("end"));
            } else {
                params.push(self.parse_or()?);
            }
        }

        let mut params = params.into_iter();
        match (params.next(), params.next(), params.next()) {
            (Some(start), Some(end), None) => Ok(Node::range(start, end, None)),
            (Some(start), Some(step), Some(end)) => Ok(Node::range(start, end, Some(Rc::new(step)))),
            (Some(node), None, None) => Ok(node),
            _ => Err(self.error("Value expected")),
        }
    }

    fn at_range_bound(&self) -> bool {
        let token = self.token();
        token.kind == TokenKind::End
            || token.is_delimiter(")")
            || token.is_delimiter("]")
            || token.is_delimiter(",")
    }

    fn parse_left_assoc(
        &mut self,
        ops: &[&str],
        operand: fn(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<Node> {
        let mut node = operand(self)?;
        while let Some(op) = self.operator_in(ops) {
            self.advance_skip_newline();
            let rhs = operand(self)?;
            node = self.binary(&op, vec![node, rhs])?;
        }
        Ok(node)
    }

    fn parse_or(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["or"], Self::parse_xor)
    }

    fn parse_xor(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["xor"], Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["and"], Self::parse_bit_or)
    }

    fn parse_bit_or(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["|"], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["^|"], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["&"], Self::parse_relational)
    }

    /// Comparisons chain: `a < b <= c` compares each neighbouring pair
    fn parse_relational(&mut self) -> ParseResult<Node> {
        let mut params = vec![self.parse_shift()?];
        let mut ops = Vec::new();
        while let Some(op) = self.operator_in(&RELATIONAL_OPERATORS) {
            self.advance_skip_newline();
            ops.push(op);
            params.push(self.parse_shift()?);
        }

        match ops.as_slice() {
            [] => Ok(params.remove(0)),
            [op] => self.binary(op, params),
            _ => {
                let conditionals = ops
                    .iter()
                    .filter_map(|op| binary_from_symbol(op))
                    .map(|op| op.to_string())
                    .collect();
                Node::relational(conditionals, params.into_iter().map(Rc::new).collect())
                    .map_err(|err| self.node_error(&err))
            }
        }
    }

    fn parse_shift(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["<<", ">>", ">>>"], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Node> {
        self.parse_left_assoc(&MULTIPLICATIVE_OPERATORS, Self::parse_implicit_multiplication)
    }

    /// Juxtaposition multiplies: `2x`, `2 pi`, `(1+2)(3+4)`, `x y`.
    /// Two numbers in a row do not, nor a number after an operator other than `!`.
    fn parse_implicit_multiplication(&mut self) -> ParseResult<Node> {
        let mut node = self.parse_numeric_fraction()?;
        let mut last_is_number = is_number_like(&node);
        loop {
            let token = self.token();
            let multiplies = token.kind == TokenKind::Identifier
                || token.is_delimiter("(")
                || (token.kind == TokenKind::Number && !last_is_number);
            if !multiplies {
                return Ok(node);
            }
            let last = self.parse_numeric_fraction()?;
            last_is_number = is_number_like(&last);
            node = Node::implicit_multiply(node, last);
        }
    }

    /// A number divided by a number binds tighter than the implicit
    /// multiplication that follows it, so `1/2x` is `(1/2)*x`.
    fn parse_numeric_fraction(&mut self) -> ParseResult<Node> {
        let mut node = self.parse_unary()?;
        let mut last = node.clone();
        while self.token().is_operator("/") && is_numeric_literal(&last) {
            let before_slash = self.index;
            self.advance_skip_newline();
            if self.token().kind != TokenKind::Number {
                self.index = before_slash;
                break;
            }
            let before_denominator = self.index;
            self.advance_skip_newline();
            let followed_by_factor =
                self.token().kind == TokenKind::Identifier || self.token().is_delimiter("(");
            self.index = before_denominator;
            if !followed_by_factor {
                self.index = before_slash;
                break;
            }
            last = self.parse_unary()?;
            node = self.binary("/", vec![node, last.clone()])?;
        }
        Ok(node)
    }

    /// Every nested operand passes through here, so this is where nesting is bounded
    fn parse_unary(&mut self) -> ParseResult<Node> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("Maximum nesting depth exceeded"));
        }
        self.depth += 1;
        let node = self.parse_prefixed();
        self.depth -= 1;
        node
    }

    fn parse_prefixed(&mut self) -> ParseResult<Node> {
        let token = self.token();
        let prefix = (token.kind == TokenKind::Operator)
            .then(|| prefix_from_symbol(&token.text))
            .flatten();
        let Some(op) = prefix else {
            return self.parse_pow();
        };
        let symbol = token.text.clone();
        self.advance_skip_newline();
        let operand = self.parse_unary()?;
        Node::operator(symbol, op.to_string(), vec![Rc::new(operand)])
            .map_err(|err| self.node_error(&err))
    }

    /// Right associative, the exponent may carry a sign: `2^-3^2` is `2^(-(3^2))`
    fn parse_pow(&mut self) -> ParseResult<Node> {
        let node = self.parse_postfix()?;
        match self.operator_in(&["^", ".^"]) {
            Some(op) => {
                self.advance_skip_newline();
                let exponent = self.parse_unary()?;
                self.binary(&op, vec![node, exponent])
            }
            None => Ok(node),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Node> {
        let primary = self.parse_primary()?;
        let mut node = self.parse_accessors(primary)?;
        while self.token().kind == TokenKind::Operator
            && let Some(op) = postfix_from_symbol(&self.token().text)
        {
            let symbol = self.token().text.clone();
            self.advance();
            node = Node::operator(symbol, op.to_string(), vec![Rc::new(node)])
                .map_err(|err| self.node_error(&err))?;
            node = self.parse_accessors(node)?;
        }
        Ok(node)
    }

    /// Calls `f(x)`, indexes `a[1, 2]` and properties `a.b`, in any sequence
    fn parse_accessors(&mut self, mut node: Node) -> ParseResult<Node> {
        loop {
            let token = self.token();
            if token.is_delimiter("(") {
                if !matches!(node, Node::Symbol { .. } | Node::Accessor { .. }) {
                    return Ok(node);
                }
                self.open_params();
                let args = self.parse_list(")", "Parenthesis ) expected")?;
                node = Node::function(node, args);
            } else if token.is_delimiter("[") {
                self.open_params();
                let dimensions = self.parse_list("]", "Parenthesis ] expected")?;
                let index = Node::index(dimensions, false).map_err(|err| self.node_error(&err))?;
                node = Node::accessor(node, index).map_err(|err| self.node_error(&err))?;
            } else if token.is_delimiter(".") {
                self.advance();
                if self.token().kind != TokenKind::Identifier {
                    return Err(self.error("Property name expected after dot"));
                }
                let name = self.token().text.clone();
                self.advance();
                node = Node::accessor(node, Node::property_index(name))
                    .map_err(|err| self.node_error(&err))?;
            } else {
                return Ok(node);
            }
        }
    }

    /// Comma separated expressions up to and including `close`, after the opening bracket
    fn parse_list(&mut self, close: &str, missing_close: &str) -> ParseResult<Vec<Rc<Node>>> {
        let mut items = Vec::new();
        if !self.token().is_delimiter(close) {
            items.push(Rc::new(self.parse_assignment()?));
            while self.token().is_delimiter(",") {
                self.advance();
                items.push(Rc::new(self.parse_assignment()?));
            }
        }
        if !self.token().is_delimiter(close) {
            return Err(self.error(missing_close));
        }
        self.close_params();
        Ok(items)
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let token = self.token().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Node::number(token.text))
            }
            TokenKind::Str => {
                let value = decode_string(&token.text).ok_or_else(|| self.error("Invalid string literal"))?;
                self.advance();
                Ok(Node::string(value))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(match token.text.as_str() {
                    "true" => Node::boolean(true),
                    "false" => Node::boolean(false),
                    "null" => Node::null(),
                    "undefined" => Node::undefined(),
                    "NaN" | "Infinity" => Node::number(token.text),
                    _ => Node::symbol(token.text),
                })
            }
            // Named operators double as function names, as in `mod(7, 3)`
            TokenKind::Operator if NAMED_OPERATORS.contains(&token.text.as_str()) => {
                self.advance();
                Ok(Node::symbol(token.text))
            }
            TokenKind::Delimiter if token.text == "(" => self.parse_parenthesis(),
            TokenKind::Delimiter if token.text == "[" => self.parse_matrix(),
            TokenKind::Delimiter if token.text == "{" => self.parse_object(),
            TokenKind::Unknown => Err(self.unknown_token_error()),
            TokenKind::End => Err(self.error("Unexpected end of expression")),
            TokenKind::Operator if token.text == "'" => Err(self.error(
                "Value expected. Note: strings must be enclosed by double quotes",
            )),
            _ => Err(self.error("Value expected")),
        }
    }

    fn parse_parenthesis(&mut self) -> ParseResult<Node> {
        self.open_params();
        let content = self.parse_assignment()?;
        if !self.token().is_delimiter(")") {
            return Err(self.error("Parenthesis ) expected"));
        }
        self.close_params();
        Ok(Node::parenthesis(content))
    }

    /// `[1, 2]` is a flat array, `[1, 2; 3, 4]` an array of rows
    fn parse_matrix(&mut self) -> ParseResult<Node> {
        self.open_params();
        if self.token().is_delimiter("]") {
            self.close_params();
            return Ok(Node::array(Vec::new()));
        }

        let mut rows = vec![self.parse_row()?];
        while self.token().is_delimiter(";") {
            self.advance();
            rows.push(self.parse_row()?);
        }
        if !self.token().is_delimiter("]") {
            return Err(self.error("End of matrix ] expected"));
        }
        let position = self.token().position;
        self.close_params();

        if rows.len() == 1 {
            return Ok(Node::array(rows.remove(0)));
        }
        let columns = rows[0].len();
        if let Some(row) = rows.iter().find(|row| row.len() != columns) {
            return Err(SyntaxError::new(
                format!("Column dimensions mismatch ({} !== {columns})", row.len()),
                position,
            ));
        }
        Ok(Node::array(
            rows.into_iter().map(|row| Rc::new(Node::array(row))).collect(),
        ))
    }

    fn parse_row(&mut self) -> ParseResult<Vec<Rc<Node>>> {
        let mut items = vec![Rc::new(self.parse_assignment()?)];
        while self.token().is_delimiter(",") {
            self.advance();
            items.push(Rc::new(self.parse_assignment()?));
        }
        Ok(items)
    }

    /// `{a: 1, "b c": 2}`, keys are identifiers or strings
    fn parse_object(&mut self) -> ParseResult<Node> {
        self.open_params();
        let mut properties = OrderMap::new();
        while !self.token().is_delimiter("}") {
            let token = self.token().clone();
            let key = match token.kind {
                TokenKind::Str => {
                    decode_string(&token.text).ok_or_else(|| self.error("Invalid string literal"))?
                }
                TokenKind::Identifier => token.text,
                TokenKind::Operator if NAMED_OPERATORS.contains(&token.text.as_str()) => token.text,
                _ => return Err(self.error("Symbol or string expected as object key")),
            };
            self.advance();
            if !self.token().is_operator(":") {
                return Err(self.error("Colon : expected after object key"));
            }
            self.advance();
            let value = self.parse_assignment()?;
            properties.insert(key, Rc::new(value));
            if !self.token().is_delimiter(",") {
                break;
            }
            self.advance();
        }
        if !self.token().is_delimiter("}") {
            return Err(self.error("Comma , or bracket } expected after object value"));
        }
        self.close_params();
        Ok(Node::object(properties))
    }
}

/// Unescape the raw contents of a string token
fn decode_string(raw: &str) -> Option<String> {
    serde_json::from_str(&format!("\"{raw}\"")).ok()
}

/// A numeric constant, possibly signed, such as `2` or `-2`
fn is_numeric_literal(node: &Node) -> bool {
    match node {
        Node::Constant { value_type, .. } => *value_type == ConstantType::Number,
        Node::Operator { op, args, .. } => {
            matches!(op.as_str(), "-" | "+" | "~")
                && matches!(args.as_slice(), [arg] if is_numeric_literal(arg))
        }
        _ => false,
    }
}

/// Nodes after which a number literal does not imply a multiplication
fn is_number_like(node: &Node) -> bool {
    match node {
        Node::Constant { .. } => true,
        Node::Operator { op, .. } => op != "!",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::OperatorFn;

    fn rc(node: Node) -> Rc<Node> {
        Rc::new(node)
    }

    fn num(value: &str) -> Node {
        Node::number(value)
    }

    fn sym(name: &str) -> Node {
        Node::symbol(name)
    }

    fn op(op: OperatorFn, args: Vec<Node>) -> Node {
        Node::op(op, args.into_iter().map(Rc::new).collect()).unwrap()
    }

    fn error_at(source: &str) -> (String, usize) {
        let err = parse(source).unwrap_err();
        (err.message, err.position)
    }

    #[test]
    fn precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            op(OperatorFn::Add, vec![num("1"), op(OperatorFn::Multiply, vec![num("2"), num("3")])])
        );
        assert_eq!(
            parse("-2^2").unwrap(),
            op(OperatorFn::UnaryMinus, vec![op(OperatorFn::Pow, vec![num("2"), num("2")])])
        );
        assert_eq!(
            parse("2^3^4").unwrap(),
            op(OperatorFn::Pow, vec![num("2"), op(OperatorFn::Pow, vec![num("3"), num("4")])])
        );
        assert_eq!(
            parse("2^-1").unwrap(),
            op(OperatorFn::Pow, vec![num("2"), op(OperatorFn::UnaryMinus, vec![num("1")])])
        );
        assert_eq!(
            parse("a or b and c").unwrap(),
            op(OperatorFn::Or, vec![sym("a"), op(OperatorFn::And, vec![sym("b"), sym("c")])])
        );
        assert_eq!(
            parse("1 - 2 - 3").unwrap(),
            op(OperatorFn::Subtract, vec![op(OperatorFn::Subtract, vec![num("1"), num("2")]), num("3")])
        );
    }

    #[test]
    fn operator_spelling_is_kept() {
        let Node::Operator { op, fn_name, .. } = parse("7 % 3").unwrap() else {
            panic!("expected an operator");
        };
        assert_eq!((op.as_str(), fn_name.as_str()), ("%", "mod"));
        let Node::Operator { op, fn_name, .. } = parse("7 mod 3").unwrap() else {
            panic!("expected an operator");
        };
        assert_eq!((op.as_str(), fn_name.as_str()), ("mod", "mod"));
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(parse("2x").unwrap(), Node::implicit_multiply(num("2"), sym("x")));
        assert_eq!(
            parse("2 x y").unwrap(),
            Node::implicit_multiply(Node::implicit_multiply(num("2"), sym("x")), sym("y"))
        );
        assert_eq!(
            parse("(1)(2)").unwrap(),
            Node::implicit_multiply(Node::parenthesis(num("1")), Node::parenthesis(num("2")))
        );
        assert_eq!(
            parse("1/2x").unwrap(),
            Node::implicit_multiply(op(OperatorFn::Divide, vec![num("1"), num("2")]), sym("x"))
        );
        assert_eq!(
            parse("1/x y").unwrap(),
            op(OperatorFn::Divide, vec![num("1"), Node::implicit_multiply(sym("x"), sym("y"))])
        );
        assert_eq!(error_at("2 3"), ("Unexpected \"3\"".to_owned(), 2));
    }

    #[test]
    fn function_calls_and_accessors() {
        assert_eq!(
            parse("sqrt(4)").unwrap(),
            Node::call("sqrt", vec![rc(num("4"))])
        );
        let node = parse("a.b[2](x)").unwrap();
        let Node::Function { callee, args } = &node else {
            panic!("expected a call");
        };
        assert_eq!(args.len(), 1);
        let Node::Accessor { object, index } = callee.as_ref() else {
            panic!("expected an accessor");
        };
        assert_eq!(index.as_ref(), &Node::index(vec![rc(num("2"))], false).unwrap());
        assert_eq!(
            object.as_ref(),
            &Node::accessor(sym("a"), Node::property_index("b")).unwrap()
        );
        assert_eq!(
            parse("mod(7, 3)").unwrap(),
            Node::call("mod", vec![rc(num("7")), rc(num("3"))])
        );
    }

    #[test]
    fn postfix_operators() {
        assert_eq!(parse("3!").unwrap(), op(OperatorFn::Factorial, vec![num("3")]));
        assert_eq!(
            parse("a'^2").unwrap(),
            op(OperatorFn::Pow, vec![op(OperatorFn::Transpose, vec![sym("a")]), num("2")])
        );
        assert_eq!(
            parse("3! 2").unwrap(),
            Node::implicit_multiply(op(OperatorFn::Factorial, vec![num("3")]), num("2"))
        );
    }

    #[test]
    fn ranges() {
        assert_eq!(parse("0:10").unwrap(), Node::range(num("0"), num("10"), None));
        let Node::Range { step, .. } = parse("0:2:10").unwrap() else {
            panic!("expected a range");
        };
        assert_eq!(step.as_deref(), Some(&num("2")));
        assert_eq!(error_at("0:1:2:3"), ("too many range parts".to_owned(), 5));
        assert_eq!(
            parse("1+1:2*3").unwrap(),
            Node::range(
                op(OperatorFn::Add, vec![num("1"), num("1")]),
                op(OperatorFn::Multiply, vec![num("2"), num("3")]),
                None
            )
        );
    }

    #[test]
    fn omitted_range_bounds_in_index() {
        let node = parse("a[:, 2:]").unwrap();
        let Node::Accessor { index, .. } = node else {
            panic!("expected an accessor");
        };
        let Node::Index { dimensions, .. } = index.as_ref() else {
            panic!("expected an index");
        };
        assert_eq!(dimensions[0].as_ref(), &Node::range(num("1"), sym("end"), None));
        assert_eq!(dimensions[1].as_ref(), &Node::range(num("2"), sym("end"), None));
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            parse("a ? b : c").unwrap(),
            Node::conditional(sym("a"), sym("b"), sym("c"))
        );
        assert_eq!(
            parse("a ? b : c ? d : e").unwrap(),
            Node::conditional(sym("a"), sym("b"), Node::conditional(sym("c"), sym("d"), sym("e")))
        );
        assert_eq!(
            parse("a ? (1:3) : 2:4").unwrap(),
            Node::conditional(
                sym("a"),
                Node::parenthesis(Node::range(num("1"), num("3"), None)),
                Node::range(num("2"), num("4"), None)
            )
        );
        assert_eq!(
            error_at("a ? b"),
            ("False part of conditional expression expected".to_owned(), 5)
        );
    }

    #[test]
    fn relational_chains() {
        assert_eq!(parse("a < b").unwrap(), op(OperatorFn::Smaller, vec![sym("a"), sym("b")]));
        assert_eq!(
            parse("a < b <= c").unwrap(),
            Node::relational(
                vec!["smaller".to_owned(), "smallerEq".to_owned()],
                vec![rc(sym("a")), rc(sym("b")), rc(sym("c"))]
            )
            .unwrap()
        );
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse("x = 2").unwrap(),
            Node::assignment(sym("x"), None, num("2")).unwrap()
        );
        assert_eq!(
            parse("a.b = 2").unwrap(),
            Node::assignment(sym("a"), Some(rc(Node::property_index("b"))), num("2")).unwrap()
        );
        assert_eq!(
            parse("f(x, y) = x + y").unwrap(),
            Node::function_assignment(
                "f",
                vec!["x".to_owned(), "y".to_owned()],
                op(OperatorFn::Add, vec![sym("x"), sym("y")])
            )
            .unwrap()
        );
        assert_eq!(
            parse("a = b = 1").unwrap(),
            Node::assignment(sym("a"), None, Node::assignment(sym("b"), None, num("1")).unwrap())
                .unwrap()
        );
        assert_eq!(
            error_at("2 = 3"),
            ("Invalid left hand side of assignment operator =".to_owned(), 2)
        );
        assert_eq!(
            error_at("f(2) = 3"),
            ("Invalid left hand side of assignment operator =".to_owned(), 5)
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse("\"a\\nb\"").unwrap(), Node::string("a\nb"));
        assert_eq!(parse("true").unwrap(), Node::boolean(true));
        assert_eq!(parse("null").unwrap(), Node::null());
        assert_eq!(
            parse("Infinity").unwrap(),
            Node::constant("Infinity", ConstantType::Number)
        );
        assert_eq!(parse("").unwrap(), Node::undefined());
        assert_eq!(parse("  # just a comment").unwrap(), Node::undefined());
    }

    #[test]
    fn matrices() {
        assert_eq!(
            parse("[1, 2]").unwrap(),
            Node::array(vec![rc(num("1")), rc(num("2"))])
        );
        assert_eq!(
            parse("[1, 2; 3, 4]").unwrap(),
            Node::array(vec![
                rc(Node::array(vec![rc(num("1")), rc(num("2"))])),
                rc(Node::array(vec![rc(num("3")), rc(num("4"))])),
            ])
        );
        assert_eq!(parse("[]").unwrap(), Node::array(vec![]));
        assert_eq!(
            parse("[\n1,\n2\n]").unwrap(),
            Node::array(vec![rc(num("1")), rc(num("2"))])
        );
        assert_eq!(
            error_at("[1, 2; 3]"),
            ("Column dimensions mismatch (1 !== 2)".to_owned(), 8)
        );
        assert_eq!(error_at("[1, 2"), ("End of matrix ] expected".to_owned(), 5));
    }

    #[test]
    fn objects() {
        let node = parse("{a: 1, \"b c\": x + 1,}").unwrap();
        let Node::Object { properties } = &node else {
            panic!("expected an object");
        };
        assert_eq!(properties.keys().collect::<Vec<_>>(), ["a", "b c"]);
        assert_eq!(parse("{}").unwrap(), Node::object(OrderMap::new()));
        assert_eq!(
            error_at("{1: 2}"),
            ("Symbol or string expected as object key".to_owned(), 1)
        );
        assert_eq!(error_at("{a 2}"), ("Colon : expected after object key".to_owned(), 3));
        assert_eq!(
            error_at("{a: 1 2}"),
            ("Comma , or bracket } expected after object value".to_owned(), 6)
        );
    }

    #[test]
    fn blocks() {
        let node = parse("a = 2; b = 3\na * b").unwrap();
        let Node::Block { blocks } = &node else {
            panic!("expected a block");
        };
        assert_eq!(
            blocks.iter().map(|b| b.visible).collect::<Vec<_>>(),
            [false, true, true]
        );
        assert_eq!(
            blocks[2].node.as_ref(),
            &op(OperatorFn::Multiply, vec![sym("a"), sym("b")])
        );
        let Node::Block { blocks } = parse("1;").unwrap() else {
            panic!("expected a block");
        };
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].visible);
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        assert_eq!(
            parse("f(1,\n 2)").unwrap(),
            Node::call("f", vec![rc(num("1")), rc(num("2"))])
        );
        assert_eq!(
            parse("1 +\n 2").unwrap(),
            op(OperatorFn::Add, vec![num("1"), num("2")])
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse(&nested(50)).is_ok());
        assert!(parse(&format!("{}x", "-".repeat(50))).is_ok());

        let (message, position) = error_at(&nested(50_000));
        assert_eq!(message, "Maximum nesting depth exceeded");
        assert_eq!(position, MAX_DEPTH);
        assert!(parse(&format!("{}1{}", "[".repeat(50_000), "]".repeat(50_000))).is_err());
        assert!(parse(&format!("{}x", "-".repeat(50_000))).is_err());
        assert!(parse(&format!("{}1", "f(".repeat(50_000))).is_err());
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(error_at("(1 + 2"), ("Parenthesis ) expected".to_owned(), 6));
        assert_eq!(error_at("f(1"), ("Parenthesis ) expected".to_owned(), 3));
        assert_eq!(error_at("a[1"), ("Parenthesis ] expected".to_owned(), 3));
        assert_eq!(error_at("1 +"), ("Unexpected end of expression".to_owned(), 3));
        assert_eq!(error_at("1 )"), ("Unexpected operator )".to_owned(), 2));
        assert_eq!(error_at("2 + @"), ("Syntax error in part \"@\"".to_owned(), 4));
        assert_eq!(error_at("\"abc"), ("End of string \" expected".to_owned(), 0));
        assert_eq!(error_at("a.(1)"), ("Property name expected after dot".to_owned(), 2));
        assert_eq!(
            error_at("'abc'"),
            ("Value expected. Note: strings must be enclosed by double quotes".to_owned(), 0)
        );
        assert_eq!(error_at("1 + * 2"), ("Value expected".to_owned(), 4));
    }
}
