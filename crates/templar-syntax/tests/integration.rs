use proptest::prelude::*;
use templar_syntax::{parse, parse_expr, Expr, Literal, Node};

#[test]
fn layout_page_structure() {
    let source = r#"{% layout("layouts::main", {title: "Home"}) -%}
{% start("scripts") %}<script src="app.js"></script>{% stop() %}
<ul>
{% for item in items %}  <li>{{ e(item.name) }}</li>
{% endfor %}</ul>"#;

    let tpl = parse(source).unwrap();

    let calls: Vec<&str> = tpl
        .nodes
        .iter()
        .filter_map(|n| match n {
            Node::Exec {
                expr: Expr::Call { name, .. },
                ..
            } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(calls, vec!["layout", "start", "stop"]);

    let for_line = tpl.nodes.iter().find_map(|n| match n {
        Node::For { line, .. } => Some(*line),
        _ => None,
    });
    assert_eq!(for_line, Some(4));
}

#[test]
fn trim_after_layout_removes_newline() {
    let tpl = parse("{% layout(\"base\") -%}\nBody").unwrap();
    assert_eq!(tpl.nodes[1], Node::Text("Body".into()));
}

#[test]
fn nested_blocks() {
    let tpl = parse("{% for x in xs %}{% if x %}{{ x }}{% endif %}{% endfor %}").unwrap();
    match &tpl.nodes[0] {
        Node::For { body, .. } => assert!(matches!(body[0], Node::If { .. })),
        other => panic!("unexpected node {:?}", other),
    }
}

#[test]
fn syntax_error_line_is_reported() {
    let err = parse("ok\nok\n{{ a b }}").unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn float_literal() {
    assert_eq!(parse_expr("2.5").unwrap(), Expr::Literal(Literal::Float(2.5)));
}

proptest! {
    // Text without tag openers survives parsing untouched.
    #[test]
    fn plain_text_roundtrips(text in "[a-zA-Z0-9 <>/=\"'\\n.,!?-]{1,64}") {
        let tpl = parse(&text).unwrap();
        prop_assert_eq!(tpl.nodes, vec![Node::Text(text.clone())]);
    }

    #[test]
    fn integer_literals(n in -100_000i64..100_000) {
        prop_assert_eq!(parse_expr(&n.to_string()).unwrap(), Expr::Literal(Literal::Int(n)));
    }
}
