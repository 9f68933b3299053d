use super::builder::*;
use super::*;
use serde_json::Value as JsonValue;

fn sample_tree() -> Vec<SyntaxNode> {
    vec![
        at_line(
            assign(
                var("users"),
                method(
                    static_call("DB", "table", vec![string("users")]),
                    "whereRaw",
                    vec![concat(string("id = "), var("id"))],
                ),
            ),
            3,
        ),
        at_line(
            static_call("User", "create", vec![method(call("request", vec![]), "all", vec![])]),
            5,
        ),
        at_line(class("User", Some("Model"), vec![property("fillable", None)]), 9),
    ]
}

#[test]
fn walk_is_preorder_left_to_right() {
    let tree = concat(concat(var("a"), var("b")), var("c"));
    let names: Vec<String> = tree
        .walk()
        .filter_map(|n| match &n.node {
            Node::Variable { name } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(tree.walk().count(), 5);
}

#[test]
fn method_call_children_start_with_receiver() {
    let node = method(var("q"), "where", vec![string("a"), int(1)]);
    let kinds: Vec<NodeKind> = node.children().iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Variable, NodeKind::StringLiteral, NodeKind::IntLiteral]
    );
}

#[test]
fn kind_queries_find_nested_nodes() {
    let tree = sample_tree();
    assert_eq!(find_nodes_of_kind(&tree, NodeKind::Concat).len(), 1);
    assert_eq!(find_nodes_of_kind(&tree, NodeKind::StaticCall).len(), 2);
    assert_eq!(find_classes(&tree).len(), 1);
    assert_eq!(find_calls(&tree).len(), 5);
}

#[test]
fn static_call_query_ignores_case_and_namespace() {
    let mut tree = sample_tree();
    tree.push(static_call("\\App\\Models\\User", "CREATE", vec![]));
    assert_eq!(find_static_calls(&tree, "user", "create").len(), 2);
    assert_eq!(find_static_calls(&tree, "DB", "table").len(), 1);
    assert!(find_static_calls(&tree, "DB", "select").is_empty());
}

#[test]
fn method_and_function_queries() {
    let tree = sample_tree();
    let calls = find_method_calls_by_name(&tree, "whereraw");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_args().len(), 1);
    assert_eq!(find_function_calls(&tree, "request").len(), 1);
}

#[test]
fn array_helpers_read_string_keys() {
    let arr = map(vec![("rounds", int(12)), ("debug", constant("TRUE"))]);
    assert_eq!(arr.array_get("rounds").and_then(|n| n.as_int()), Some(12));
    assert!(arr.array_get("debug").is_some_and(|n| n.is_true()));
    assert!(arr.array_get("missing").is_none());
}

#[test]
fn imports_default_to_last_segment() {
    let mut file = FileAst::new("a.php".into());
    file.push(SyntaxNode::new(
        Span::at(2),
        Node::Use {
            path: "Illuminate\\Support\\Facades\\DB".into(),
            alias: None,
        },
    ));
    file.push(SyntaxNode::new(
        Span::at(3),
        Node::Use {
            path: "Illuminate\\Support\\Facades\\Hash".into(),
            alias: Some("Hasher".into()),
        },
    ));
    assert_eq!(
        file.imports(),
        vec![
            ("DB".to_string(), "Illuminate\\Support\\Facades\\DB".to_string()),
            ("Hasher".to_string(), "Illuminate\\Support\\Facades\\Hash".to_string()),
        ]
    );
}

#[test]
fn file_ast_serialization_preserves_spans() {
    let mut file = FileAst::new("routes/web.php".into());
    for node in sample_tree() {
        file.push(node);
    }
    let json = file.to_json().unwrap();
    let v: JsonValue = serde_json::from_str(&json).unwrap();
    assert_eq!(v["nodes"][1]["span"]["line"], 5);
    assert_eq!(v["nodes"][0]["node"]["type"], "assignment");
    let back: FileAst = serde_json::from_str(&json).unwrap();
    assert_eq!(back.nodes, file.nodes);
}

#[test]
fn span_end_line_never_precedes_start() {
    let span = Span::new(7, 3, 2);
    assert_eq!(span.end_line, 7);
}
