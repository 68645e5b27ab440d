use std::{cell::LazyCell, collections::HashMap};

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Associativity {
    Left,
    Right,
}

impl Associativity {
    pub fn is_left(self) -> bool {
        self == Self::Left
    }

    pub fn is_right(self) -> bool {
        self == Self::Right
    }
}

/// Binding strength of non-operator nodes, see [`OperatorFn::precedence`]
pub const ASSIGNMENT_PRECEDENCE: u8 = 0;
pub const CONDITIONAL_PRECEDENCE: u8 = 1;
pub const RANGE_PRECEDENCE: u8 = 2;
pub const RELATIONAL_PRECEDENCE: u8 = 9;

/// Function names operators are evaluated as. Displays as the function name, e.g.
/// `OperatorFn::SmallerEq` is `smallerEq`.
#[derive(
    Debug, Hash, PartialEq, Eq, Clone, Copy, EnumIter, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum OperatorFn {
    Or,
    Xor,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    Unequal,
    Smaller,
    Larger,
    SmallerEq,
    LargerEq,
    LeftShift,
    RightArithShift,
    RightLogShift,
    Add,
    Subtract,
    Multiply,
    Divide,
    DotMultiply,
    DotDivide,
    Mod,
    UnaryMinus,
    UnaryPlus,
    BitNot,
    Not,
    Pow,
    DotPow,
    Factorial,
    Transpose,
}

impl OperatorFn {
    pub fn symbol(self) -> &'static str {
        use OperatorFn::*;
        match self {
            Or => "or",
            Xor => "xor",
            And => "and",
            BitOr => "|",
            BitXor => "^|",
            BitAnd => "&",
            Equal => "==",
            Unequal => "!=",
            Smaller => "<",
            Larger => ">",
            SmallerEq => "<=",
            LargerEq => ">=",
            LeftShift => "<<",
            RightArithShift => ">>",
            RightLogShift => ">>>",
            Add | UnaryPlus => "+",
            Subtract | UnaryMinus => "-",
            Multiply => "*",
            Divide => "/",
            DotMultiply => ".*",
            DotDivide => "./",
            Mod => "mod",
            BitNot => "~",
            Not => "not",
            Pow => "^",
            DotPow => ".^",
            Factorial => "!",
            Transpose => "'",
        }
    }

    pub fn latex_symbol(self) -> &'static str {
        use OperatorFn::*;
        match self {
            Or => "\\vee",
            Xor => "\\veebar",
            And => "\\wedge",
            BitOr => "|",
            BitXor => "\\underline{|}",
            BitAnd => "\\&",
            Equal => "=",
            Unequal => "\\neq",
            Smaller => "<",
            Larger => ">",
            SmallerEq => "\\leq",
            LargerEq => "\\geq",
            LeftShift => "<<",
            RightArithShift => ">>",
            RightLogShift => ">>>",
            Add | UnaryPlus => "+",
            Subtract | UnaryMinus => "-",
            Multiply => "\\cdot",
            Divide => "\\frac",
            DotMultiply => ".\\cdot",
            DotDivide => ".:",
            Mod => "\\mod",
            BitNot => "\\~",
            Not => "\\neg",
            Pow => "^",
            DotPow => ".^\\wedge",
            Factorial => "!",
            Transpose => "^\\top",
        }
    }

    /// Higher binds tighter. Assignment is 0, conditionals 1, ranges 2.
    pub fn precedence(self) -> u8 {
        use OperatorFn::*;
        match self {
            Or => 3,
            Xor => 4,
            And => 5,
            BitOr => 6,
            BitXor => 7,
            BitAnd => 8,
            Equal | Unequal | Smaller | Larger | SmallerEq | LargerEq => RELATIONAL_PRECEDENCE,
            LeftShift | RightArithShift | RightLogShift => 10,
            Add | Subtract => 11,
            Multiply | Divide | DotMultiply | DotDivide | Mod => 12,
            UnaryMinus | UnaryPlus | BitNot | Not => 13,
            Pow | DotPow => 14,
            Factorial => 15,
            Transpose => 16,
        }
    }

    /// Prefix operators are right associative, postfix ones left
    pub fn associativity(self) -> Associativity {
        use OperatorFn::*;
        match self {
            UnaryMinus | UnaryPlus | BitNot | Not | Pow | DotPow => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    /// Operators that may appear unparenthesized as the right operand of `self` at equal
    /// precedence, e.g. `a + (b - c)` prints as `a + b - c`
    pub fn associative_with(self) -> &'static [OperatorFn] {
        use OperatorFn::*;
        match self {
            Add => &[Add, Subtract],
            Multiply => &[Multiply, Divide],
            DotMultiply => &[Multiply, Divide, DotMultiply, DotDivide],
            _ => &[],
        }
    }

    pub fn is_unary(self) -> bool {
        use OperatorFn::*;
        matches!(
            self,
            UnaryMinus | UnaryPlus | BitNot | Not | Factorial | Transpose
        )
    }

    pub fn is_relational(self) -> bool {
        self.precedence() == RELATIONAL_PRECEDENCE
    }

    /// LaTeX output adds no parentheses around operands of this operator
    pub fn latex_omits_parens(self, side: Side) -> bool {
        use OperatorFn::*;
        match (self, side) {
            (Divide, _) => true,
            (Pow | DotPow, Side::Right) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

thread_local! {
    static BINARY_SYMBOL_MAP: LazyCell<HashMap<&'static str, OperatorFn>> = LazyCell::new(|| {
        let mut map = HashMap::new();
        for op in OperatorFn::iter().filter(|op| !op.is_unary()) {
            map.insert(op.symbol(), op);
        }
        map.insert("%", OperatorFn::Mod);
        map
    });
}

/// Binary operator for a token, `-` is subtraction here
pub fn binary_from_symbol(symbol: &str) -> Option<OperatorFn> {
    BINARY_SYMBOL_MAP.with(|map| map.get(symbol).copied())
}

pub fn prefix_from_symbol(symbol: &str) -> Option<OperatorFn> {
    use OperatorFn::*;
    match symbol {
        "-" => Some(UnaryMinus),
        "+" => Some(UnaryPlus),
        "~" => Some(BitNot),
        "not" => Some(Not),
        _ => None,
    }
}

pub fn postfix_from_symbol(symbol: &str) -> Option<OperatorFn> {
    match symbol {
        "!" => Some(OperatorFn::Factorial),
        "'" => Some(OperatorFn::Transpose),
        _ => None,
    }
}
