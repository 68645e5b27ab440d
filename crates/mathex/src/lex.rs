use lazy_regex::{regex_find, regex_is_match};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TokenKind {
    Number,
    Identifier,
    /// Symbolic or named operator, including `=`, `?` and `:`
    Operator,
    /// Brackets, `,`, `;` and `.`
    Delimiter,
    /// Raw contents of a double quoted string, escapes intact
    Str,
    Newline,
    Unknown,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Char offset of the first character
    pub position: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.is(TokenKind::Operator, text)
    }

    pub fn is_delimiter(&self, text: &str) -> bool {
        self.is(TokenKind::Delimiter, text)
    }
}

pub const NAMED_OPERATORS: [&str; 5] = ["mod", "and", "or", "xor", "not"];

/// Longest first, so `>>>` is not read as `>>` then `>`
const OPERATORS: [&str; 27] = [
    ">>>", ".*", "./", ".^", "^|", "==", "!=", "<=", ">=", "<<", ">>", "+", "-", "*", "/", "%",
    "^", "'", "!", "~", "&", "|", "=", "<", ">", "?", ":",
];

const DELIMITERS: [char; 9] = ['(', ')', '[', ']', '{', '}', ',', ';', '.'];

/// Split `source` into tokens. Never fails: characters that start no token become
/// [`TokenKind::Unknown`] and are reported by the parser. The last token is always
/// [`TokenKind::End`].
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut position = 0;

    while let Some(c) = rest.chars().next() {
        let (kind, len) = match c {
            ' ' | '\t' | '\r' => {
                rest = &rest[c.len_utf8()..];
                position += 1;
                continue;
            }
            '#' => {
                let len = rest.find('\n').unwrap_or(rest.len());
                position += rest[..len].chars().count();
                rest = &rest[len..];
                continue;
            }
            '\n' => (TokenKind::Newline, 1),
            '"' => string_literal(rest),
            _ => lex_symbolic(rest),
        };

        let (text, remaining) = rest.split_at(len);
        let (kind, text) = match kind {
            TokenKind::Str => (kind, text[1..text.len() - 1].to_owned()),
            TokenKind::Identifier if NAMED_OPERATORS.contains(&text) => {
                (TokenKind::Operator, text.to_owned())
            }
            _ => (kind, text.to_owned()),
        };
        tokens.push(Token {
            kind,
            text,
            position,
        });
        position += rest[..len].chars().count();
        rest = remaining;
    }

    tokens.push(Token {
        kind: TokenKind::End,
        text: String::new(),
        position,
    });
    tokens
}

/// Whether `name` can be used as a variable, function or parameter name
pub fn is_valid_identifier(name: &str) -> bool {
    regex_is_match!(r"^[\p{L}_$][\p{L}\p{Nd}_$]*$", name) && !NAMED_OPERATORS.contains(&name)
}

/// Byte length of a string literal at the start of `rest`, which starts with `"`.
/// An unterminated literal swallows the rest of the input as an unknown token.
fn string_literal(rest: &str) -> (TokenKind, usize) {
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return (TokenKind::Str, i + 1),
            _ => escaped = false,
        }
    }
    (TokenKind::Unknown, rest.len())
}

fn lex_symbolic(rest: &str) -> (TokenKind, usize) {
    if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(*op)) {
        return (TokenKind::Operator, op.len());
    }
    if let Some(len) = number_len(rest) {
        return (TokenKind::Number, len);
    }
    if let Some(ident) = regex_find!(r"^[\p{L}_$][\p{L}\p{Nd}_$]*", rest) {
        return (TokenKind::Identifier, ident.len());
    }
    let c = rest.chars().next().unwrap_or('\0');
    if DELIMITERS.contains(&c) {
        return (TokenKind::Delimiter, 1);
    }
    (TokenKind::Unknown, c.len_utf8())
}

fn number_len(rest: &str) -> Option<usize> {
    regex_find!(r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?", rest).map(str::len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_owned())
    }

    #[test]
    fn numbers_identifiers_operators() {
        assert_eq!(
            kinds_and_texts("2.5e-3*x_1 >>> .5"),
            vec![
                tok(Number, "2.5e-3"),
                tok(Operator, "*"),
                tok(Identifier, "x_1"),
                tok(Operator, ">>>"),
                tok(Number, ".5"),
                tok(End, ""),
            ]
        );
    }

    #[test]
    fn dot_operators_and_property_access() {
        assert_eq!(
            kinds_and_texts("a.^2 .* obj.b"),
            vec![
                tok(Identifier, "a"),
                tok(Operator, ".^"),
                tok(Number, "2"),
                tok(Operator, ".*"),
                tok(Identifier, "obj"),
                tok(Delimiter, "."),
                tok(Identifier, "b"),
                tok(End, ""),
            ]
        );
    }

    #[test]
    fn named_operators() {
        assert_eq!(
            kinds_and_texts("a and not b mod 2"),
            vec![
                tok(Identifier, "a"),
                tok(Operator, "and"),
                tok(Operator, "not"),
                tok(Identifier, "b"),
                tok(Operator, "mod"),
                tok(Number, "2"),
                tok(End, ""),
            ]
        );
        assert_eq!(kinds_and_texts("android")[0], tok(Identifier, "android"));
    }

    #[test]
    fn strings_comments_newlines() {
        assert_eq!(
            kinds_and_texts("\"a \\\"b\\\"\" # note\nx"),
            vec![
                tok(Str, "a \\\"b\\\""),
                tok(Newline, "\n"),
                tok(Identifier, "x"),
                tok(End, ""),
            ]
        );
    }

    #[test]
    fn unknown_characters_are_tokens() {
        let tokens = tokenize("1 @ \"open");
        assert_eq!(tokens[1].kind, Unknown);
        assert_eq!(tokens[1].position, 2);
        assert_eq!(tokens[2].kind, Unknown);
        assert_eq!(tokens[2].text, "\"open");
        assert_eq!(tokens[3].kind, End);
        assert_eq!(tokens[3].position, 9);
    }

    #[test]
    fn identifiers() {
        assert!(is_valid_identifier("x_1"));
        assert!(is_valid_identifier("$total"));
        assert!(is_valid_identifier("θ"));
        assert!(!is_valid_identifier("1x"));
        assert!(!is_valid_identifier("a b"));
        assert!(!is_valid_identifier("mod"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn positions_count_chars() {
        let tokens = tokenize("α + β");
        assert_eq!(
            tokens.iter().map(|t| t.position).collect::<Vec<_>>(),
            vec![0, 2, 4, 5]
        );
    }
}
