use std::f64::consts;

use super::{Dispatcher, Param};
use crate::error::DispatchError;
use crate::value::{Value, ValueKind};

type Res = Result<Value, DispatchError>;

const NUM: Param = Param::NUMBER;
const ANY: Param = Param::Any;

pub(super) fn install(d: &mut Dispatcher) {
    arithmetic(d);
    comparisons(d);
    logic(d);
    bitwise(d);
    elementary(d);
    collections(d);

    d.define_constant("pi", Value::Number(consts::PI))
        .define_constant("e", Value::Number(consts::E))
        .define_constant("tau", Value::Number(consts::TAU))
        .define_constant("phi", Value::Number(1.618_033_988_749_895));
}

fn number(args: &[Value], i: usize) -> f64 {
    args.get(i).and_then(Value::as_number).unwrap_or(f64::NAN)
}

fn binary(d: &mut Dispatcher, name: &str, f: fn(f64, f64) -> f64) {
    d.define(name, &[NUM, NUM], move |args| {
        Ok(Value::Number(f(number(args, 0), number(args, 1))))
    });
}

fn unary(d: &mut Dispatcher, name: &str, f: fn(f64) -> f64) {
    d.define(name, &[NUM], move |args| Ok(Value::Number(f(number(args, 0)))));
}

fn arithmetic(d: &mut Dispatcher) {
    binary(d, "add", |a, b| a + b);
    binary(d, "subtract", |a, b| a - b);
    binary(d, "multiply", |a, b| a * b);
    binary(d, "dotMultiply", |a, b| a * b);
    binary(d, "divide", |a, b| a / b);
    binary(d, "dotDivide", |a, b| a / b);
    binary(d, "pow", f64::powf);
    binary(d, "dotPow", f64::powf);
    binary(d, "mod", |a, b| if b == 0.0 { a } else { a - b * (a / b).floor() });
    unary(d, "unaryMinus", |a| -a);
    unary(d, "unaryPlus", |a| a);

    d.define("add", &[Param::STRING, Param::STRING], |args| {
        let (Value::Str(a), Value::Str(b)) = (&args[0], &args[1]) else {
            unreachable!()
        };
        Ok(Value::Str(format!("{a}{b}")))
    });
    d.define("unaryPlus", &[Param::Kind(ValueKind::Bool)], |args| {
        Ok(Value::Number(f64::from(u8::from(args[0] == Value::Bool(true)))))
    });
    d.define("factorial", &[NUM], |args| {
        let n = number(args, 0);
        if n < 0.0 || n.fract() != 0.0 {
            return Err(DispatchError::failed(
                "factorial",
                "value must be a non-negative integer",
            ));
        }
        Ok(Value::Number((1..=n as u64).map(|k| k as f64).product()))
    });
}

fn comparisons(d: &mut Dispatcher) {
    d.define("equal", &[ANY, ANY], |args| Ok(Value::Bool(args[0] == args[1])));
    d.define("unequal", &[ANY, ANY], |args| Ok(Value::Bool(args[0] != args[1])));

    let ordered: [(&str, fn(f64, f64) -> bool); 4] = [
        ("smaller", |a, b| a < b),
        ("larger", |a, b| a > b),
        ("smallerEq", |a, b| a <= b),
        ("largerEq", |a, b| a >= b),
    ];
    for (name, cmp) in ordered {
        d.define(name, &[NUM, NUM], move |args| {
            Ok(Value::Bool(cmp(number(args, 0), number(args, 1))))
        });
    }
}

fn truthy(name: &str, value: &Value) -> Result<bool, DispatchError> {
    value
        .truthy()
        .map_err(|err| DispatchError::failed(name, err.to_string()))
}

fn logic(d: &mut Dispatcher) {
    d.define("and", &[ANY, ANY], |args| {
        Ok(Value::Bool(truthy("and", &args[0])? && truthy("and", &args[1])?))
    });
    d.define("or", &[ANY, ANY], |args| {
        Ok(Value::Bool(truthy("or", &args[0])? || truthy("or", &args[1])?))
    });
    d.define("xor", &[ANY, ANY], |args| {
        Ok(Value::Bool(truthy("xor", &args[0])? != truthy("xor", &args[1])?))
    });
    d.define("not", &[ANY], |args| Ok(Value::Bool(!truthy("not", &args[0])?)));
}

fn integer(name: &str, n: f64) -> Result<i64, DispatchError> {
    if n.is_finite() && n.fract() == 0.0 {
        Ok(n as i64)
    } else {
        Err(DispatchError::failed(name, "integers expected"))
    }
}

fn bitwise(d: &mut Dispatcher) {
    let ops: [(&'static str, fn(i64, i64) -> i64); 6] = [
        ("bitAnd", |a, b| a & b),
        ("bitOr", |a, b| a | b),
        ("bitXor", |a, b| a ^ b),
        ("leftShift", |a, b| a.wrapping_shl(b as u32)),
        ("rightArithShift", |a, b| a.wrapping_shr(b as u32)),
        ("rightLogShift", |a, b| (a as u64).wrapping_shr(b as u32) as i64),
    ];
    for (name, op) in ops {
        d.define(name, &[NUM, NUM], move |args| {
            let a = integer(name, number(args, 0))?;
            let b = integer(name, number(args, 1))?;
            Ok(Value::Number(op(a, b) as f64))
        });
    }
    d.define("bitNot", &[NUM], |args| {
        Ok(Value::Number(!integer("bitNot", number(args, 0))? as f64))
    });
}

fn elementary(d: &mut Dispatcher) {
    unary(d, "sqrt", f64::sqrt);
    unary(d, "abs", f64::abs);
    unary(d, "floor", f64::floor);
    unary(d, "ceil", f64::ceil);
    unary(d, "round", f64::round);
    unary(d, "exp", f64::exp);
    unary(d, "log", f64::ln);
    unary(d, "log10", f64::log10);
    unary(d, "sin", f64::sin);
    unary(d, "cos", f64::cos);
    unary(d, "tan", f64::tan);
    binary(d, "log", |x, base| x.ln() / base.ln());
    binary(d, "nthRoot", |x, n| x.powf(n.recip()));

    d.define_variadic("max", &[NUM], |args| {
        Ok(Value::Number(
            args.iter().filter_map(Value::as_number).fold(f64::NEG_INFINITY, f64::max),
        ))
    });
    d.define_variadic("min", &[NUM], |args| {
        Ok(Value::Number(
            args.iter().filter_map(Value::as_number).fold(f64::INFINITY, f64::min),
        ))
    });
    d.define("typeof", &[ANY], |args| Ok(Value::from(args[0].type_name())));
}

/// Upper bound on the number of elements a range may produce
const MAX_RANGE_LEN: f64 = 1e7;

fn range(start: f64, end: f64, step: f64) -> Res {
    if step == 0.0 {
        return Err(DispatchError::failed("range", "step must not be zero"));
    }
    let count = ((end - start) / step + 1e-10).floor();
    if count.is_nan() || count < 0.0 {
        return Ok(Value::Array(vec![]));
    }
    if count >= MAX_RANGE_LEN {
        return Err(DispatchError::failed(
            "range",
            format!("range {start}:{step}:{end} has too many elements"),
        ));
    }
    Ok(Value::Array(
        (0..=count as u64)
            .map(|i| Value::Number(start + i as f64 * step))
            .collect(),
    ))
}

fn size(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => {
            let mut dims = vec![Value::Number(items.len() as f64)];
            if let Some(first) = items.first()
                && matches!(first, Value::Array(..))
            {
                dims.extend(size(first));
            }
            dims
        }
        Value::Str(s) => vec![Value::Number(s.chars().count() as f64)],
        _ => vec![],
    }
}

fn collections(d: &mut Dispatcher) {
    d.define("range", &[NUM, NUM, NUM], |args| {
        range(number(args, 0), number(args, 1), number(args, 2))
    });
    d.define("range", &[NUM, NUM], |args| range(number(args, 0), number(args, 1), 1.0));
    d.define("size", &[ANY], |args| Ok(Value::Array(size(&args[0]))));
    d.define("index", &[], |_| Ok(Value::Index(vec![])));
    d.define_variadic("index", &[ANY], |args| Ok(Value::Index(args.to_vec())));
    d.define("matrix", &[], |_| Ok(Value::Array(vec![])));
    d.define("matrix", &[Param::ARRAY], |args| Ok(args[0].clone()));
    d.define("transpose", &[NUM], |args| Ok(args[0].clone()));
    d.define("transpose", &[Param::ARRAY], |args| transpose(&args[0]));

    d.define("subset", &[Param::ARRAY, Param::INDEX], |args| {
        get(&args[0], &selections(&args[1])?)
    });
    d.define("subset", &[Param::STRING, Param::INDEX], |args| {
        let (Value::Str(s), sels) = (&args[0], selections(&args[1])?) else {
            unreachable!()
        };
        substring(s, &sels)
    });
    d.define("subset", &[Param::ARRAY, Param::INDEX, ANY], |args| {
        set(args[0].clone(), &selections(&args[1])?, &args[2])
    });
}

fn transpose(matrix: &Value) -> Res {
    let Value::Array(rows) = matrix else {
        unreachable!()
    };
    let row_items: Vec<&Vec<Value>> = rows
        .iter()
        .filter_map(|row| match row {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .collect();
    if row_items.is_empty() {
        return Ok(matrix.clone());
    }
    if row_items.len() != rows.len() {
        return Err(DispatchError::failed("transpose", "matrix rows must be arrays"));
    }
    let columns = row_items[0].len();
    if row_items.iter().any(|row| row.len() != columns) {
        return Err(DispatchError::failed("transpose", "dimension mismatch"));
    }
    Ok(Value::Array(
        (0..columns)
            .map(|c| Value::Array(row_items.iter().map(|row| row[c].clone()).collect()))
            .collect(),
    ))
}

/// One dimension of an index, zero based
enum Selection {
    One(usize),
    Many(Vec<usize>),
}

fn position(n: f64) -> Result<usize, DispatchError> {
    if n >= 1.0 && n.fract() == 0.0 {
        Ok(n as usize - 1)
    } else {
        Err(DispatchError::failed(
            "subset",
            format!("index must be a positive integer, got {n}"),
        ))
    }
}

fn selections(index: &Value) -> Result<Vec<Selection>, DispatchError> {
    let Value::Index(dims) = index else {
        unreachable!()
    };
    dims.iter()
        .map(|dim| match dim {
            Value::Number(n) => position(*n).map(Selection::One),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Number(n) => position(*n),
                    other => Err(DispatchError::failed(
                        "subset",
                        format!("index must be a number, got {}", other.kind()),
                    )),
                })
                .collect::<Result<_, _>>()
                .map(Selection::Many),
            other => Err(DispatchError::failed(
                "subset",
                format!("unsupported index dimension {}", other.kind()),
            )),
        })
        .collect()
}

fn out_of_range(i: usize, len: usize) -> DispatchError {
    DispatchError::failed(
        "subset",
        format!("index out of range ({} > {len})", i + 1),
    )
}

fn get(value: &Value, sels: &[Selection]) -> Res {
    let Some((first, rest)) = sels.split_first() else {
        return Ok(value.clone());
    };
    let Value::Array(items) = value else {
        return Err(DispatchError::failed(
            "subset",
            format!("cannot index into {}", value.kind()),
        ));
    };
    let item = |i: usize| items.get(i).ok_or_else(|| out_of_range(i, items.len()));
    match first {
        Selection::One(i) => get(item(*i)?, rest),
        Selection::Many(positions) => positions
            .iter()
            .map(|i| get(item(*i)?, rest))
            .collect::<Result<_, _>>()
            .map(Value::Array),
    }
}

fn substring(s: &str, sels: &[Selection]) -> Res {
    let chars: Vec<char> = s.chars().collect();
    let pick = |i: usize| chars.get(i).copied().ok_or_else(|| out_of_range(i, chars.len()));
    match sels {
        [Selection::One(i)] => Ok(Value::Str(pick(*i)?.to_string())),
        [Selection::Many(positions)] => positions
            .iter()
            .map(|i| pick(*i))
            .collect::<Result<String, _>>()
            .map(Value::Str),
        _ => Err(DispatchError::failed("subset", "strings have one dimension")),
    }
}

fn set(target: Value, sels: &[Selection], value: &Value) -> Res {
    let Some((first, rest)) = sels.split_first() else {
        return Ok(value.clone());
    };
    let mut items = match target {
        Value::Array(items) => items,
        Value::Undefined => vec![],
        other => {
            return Err(DispatchError::failed(
                "subset",
                format!("cannot index into {}", other.kind()),
            ));
        }
    };
    let filler = if rest.is_empty() {
        Value::Number(0.0)
    } else {
        Value::Array(vec![])
    };
    let mut assign = |i: usize, value: &Value| -> Result<(), DispatchError> {
        if items.len() <= i {
            items.resize(i + 1, filler.clone());
        }
        items[i] = set(std::mem::take(&mut items[i]), rest, value)?;
        Ok(())
    };
    match first {
        Selection::One(i) => assign(*i, value)?,
        Selection::Many(positions) => match value {
            Value::Array(values) if values.len() == positions.len() => {
                for (i, v) in positions.iter().zip(values) {
                    assign(*i, v)?;
                }
            }
            Value::Array(values) => {
                return Err(DispatchError::failed(
                    "subset",
                    format!(
                        "dimension mismatch ({} != {})",
                        positions.len(),
                        values.len()
                    ),
                ));
            }
            scalar => {
                for i in positions {
                    assign(*i, scalar)?;
                }
            }
        },
    }
    Ok(Value::Array(items))
}
