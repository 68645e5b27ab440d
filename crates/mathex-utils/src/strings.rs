use itertools::Itertools;

const LATEX_SPECIAL: &str = "#$%&_{}~^\\";

/// Escape text so it can be placed inside `\mathrm{}` or `\mathtt{}`
pub fn escape_latex(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '~' => escaped.push_str("\\textasciitilde{}"),
            '^' => escaped.push_str("\\textasciicircum{}"),
            c if LATEX_SPECIAL.contains(c) => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Fill `{0}`, `{1}`, ... in a template with the given arguments.
/// `{args}` is replaced by all arguments joined by `,`.
/// Substitution is a single pass, so arguments containing `{1}` are left alone.
pub fn fill_template(template: &str, args: &[String]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after.find('}').map(|close| (&after[..close], close));
        match placeholder {
            Some(("args", close)) => {
                filled.push_str(&args.iter().join(","));
                rest = &after[close + 1..];
            }
            Some((digits, close))
                if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) =>
            {
                if let Some(arg) = digits.parse::<usize>().ok().and_then(|i| args.get(i)) {
                    filled.push_str(arg);
                }
                rest = &after[close + 1..];
            }
            _ => {
                filled.push('{');
                rest = after;
            }
        }
    }
    filled.push_str(rest);
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_latex("a_b"), "a\\_b");
        assert_eq!(escape_latex("50%"), "50\\%");
        assert_eq!(escape_latex("x^2"), "x\\textasciicircum{}2");
        assert_eq!(escape_latex("plain"), "plain");
    }

    #[test]
    fn fills_templates() {
        let args = vec!["x".to_owned(), "2".to_owned()];
        assert_eq!(fill_template("\\sqrt[{1}]{{0}}", &args), "\\sqrt[2]{x}");
        assert_eq!(fill_template("\\max\\left({args}\\right)", &args), "\\max\\left(x,2\\right)");
    }

    #[test]
    fn template_arguments_are_not_rescanned() {
        let args = vec!["\\frac{1}{2}".to_owned(), "3".to_owned()];
        assert_eq!(
            fill_template("\\sqrt[{1}]{{0}}", &args),
            "\\sqrt[3]{\\frac{1}{2}}"
        );
    }
}
