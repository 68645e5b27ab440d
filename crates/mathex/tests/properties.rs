use std::rc::Rc;

use mathex::{Node, parse};
use proptest::prelude::*;

/// Source text of small, fully parenthesized expressions
fn expr_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        prop::sample::select(vec!["x", "y", "alpha", "pi", "true", "\"s\""]).prop_map(String::from),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        let binop = prop::sample::select(vec!["+", "-", "*", "/", "^", "<", "==", "and", "mod"]);
        prop_oneof![
            (inner.clone(), binop, inner.clone()).prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            inner.clone().prop_map(|e| format!("(-{e})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("f({a}, {b})")),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|items| format!("[{}]", items.join(", "))),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, t, f)| format!("({c} ? {t} : {f})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a}:{b})")),
            inner.clone().prop_map(|e| format!("obj.key[{e}]")),
            inner.prop_map(|e| format!("{{a: {e}}}")),
        ]
    })
}

proptest! {
    #[test]
    fn parse_never_panics(source in ".*") {
        let _ = parse(&source);
    }

    #[test]
    fn generated_expressions_parse(source in expr_strategy()) {
        prop_assert!(parse(&source).is_ok(), "failed to parse {}", source);
    }

    #[test]
    fn json_round_trip(source in expr_strategy()) {
        let node = parse(&source).unwrap();
        let restored = Node::from_json(&node.to_json()).unwrap();
        prop_assert_eq!(&restored, &node);
        let restored = Node::from_json_str(&node.to_json_string()).unwrap();
        prop_assert_eq!(restored, node);
    }

    #[test]
    fn deep_clone_is_equal(source in expr_strategy()) {
        let node = parse(&source).unwrap();
        let copy = node.clone_deep();
        prop_assert!(copy.equals(Some(&node)));

        let children = |tree: &Node| {
            let mut found = Vec::new();
            tree.for_each(|child, _, _| found.push(Rc::clone(child)));
            found
        };
        for (copied, original) in children(&copy).iter().zip(&children(&node)) {
            prop_assert!(!Rc::ptr_eq(copied, original));
        }
        prop_assert_eq!(copy, node);
    }

    #[test]
    fn identity_rewrites_share_the_tree(source in expr_strategy()) {
        let node = Rc::new(parse(&source).unwrap());

        let mapped = node.map(|child, _, _| Rc::clone(child)).unwrap();
        prop_assert_eq!(&mapped, node.as_ref());

        let transformed = node.transform(|n, _, _| Rc::clone(n)).unwrap();
        prop_assert!(Rc::ptr_eq(&transformed, &node));
    }

    #[test]
    fn rendering_reparses_to_the_same_tree(source in expr_strategy()) {
        let node = parse(&source).unwrap();
        let rendered = node.to_string();
        prop_assert_eq!(parse(&rendered).unwrap(), node, "rendered as {}", rendered);
    }
}
