use std::borrow::Cow;

use crate::strings::escape_latex;

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "vartheta", "iota", "kappa", "varkappa", "lambda", "mu", "nu", "xi", "pi",
    "varpi", "rho", "varrho", "sigma", "varsigma", "tau", "upsilon", "phi", "varphi", "chi",
    "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Phi", "Omega",
];

/// LaTeX for a symbol name: greek letters become commands, a few named constants get
/// their conventional glyph and `a_b` is typeset as a subscript.
pub fn latex_symbol(name: &str) -> Cow<'_, str> {
    if GREEK.contains(&name) {
        return Cow::Owned(format!("\\{name}"));
    }
    match name {
        "Infinity" | "inf" => Cow::Borrowed("\\infty"),
        "NaN" => Cow::Borrowed("\\mathrm{NaN}"),
        "true" => Cow::Borrowed("\\mathrm{True}"),
        "false" => Cow::Borrowed("\\mathrm{False}"),
        "null" => Cow::Borrowed("\\mathrm{null}"),
        "undefined" => Cow::Borrowed("\\mathbf{?}"),
        "end" => Cow::Borrowed("\\mathrm{end}"),
        _ => match name.split_once('_') {
            Some((base, sub)) if !base.is_empty() => {
                Cow::Owned(format!("{}_{{{}}}", latex_symbol(base), latex_symbol(sub)))
            }
            _ if name.contains(['$', '_']) => Cow::Owned(escape_latex(name)),
            _ => Cow::Borrowed(name),
        },
    }
}

/// Template used to typeset a call of a well-known function, see
/// [`crate::strings::fill_template`] for the placeholder syntax.
pub fn latex_function(name: &str, arg_count: usize) -> Option<&'static str> {
    let template = match (name, arg_count) {
        ("sqrt", 1) => "\\sqrt{{0}}",
        ("nthRoot", 2) => "\\sqrt[{1}]{{0}}",
        ("abs", 1) => "\\left|{0}\\right|",
        ("ceil", 1) => "\\left\\lceil{0}\\right\\rceil",
        ("floor", 1) => "\\left\\lfloor{0}\\right\\rfloor",
        ("exp", 1) => "e^{{0}}",
        ("log", 1) => "\\ln\\left({0}\\right)",
        ("log", 2) => "\\log_{{1}}\\left({0}\\right)",
        ("log10", 1) => "\\log_{10}\\left({0}\\right)",
        ("sin" | "cos" | "tan" | "cot" | "sec" | "csc" | "sinh" | "cosh" | "tanh", 1) => {
            return Some(trig_template(name));
        }
        ("max", _) => "\\max\\left({args}\\right)",
        ("min", _) => "\\min\\left({args}\\right)",
        _ => return None,
    };
    Some(template)
}

fn trig_template(name: &str) -> &'static str {
    match name {
        "sin" => "\\sin\\left({0}\\right)",
        "cos" => "\\cos\\left({0}\\right)",
        "tan" => "\\tan\\left({0}\\right)",
        "cot" => "\\cot\\left({0}\\right)",
        "sec" => "\\sec\\left({0}\\right)",
        "csc" => "\\csc\\left({0}\\right)",
        "sinh" => "\\sinh\\left({0}\\right)",
        "cosh" => "\\cosh\\left({0}\\right)",
        _ => "\\tanh\\left({0}\\right)",
    }
}
