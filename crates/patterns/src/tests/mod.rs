use super::*;
use ir::builder::*;
use ir::{FileAst, Node, NodeKind, Span, SyntaxNode};
use proptest::prelude::*;

fn wrap(node: SyntaxNode, kind: u8) -> SyntaxNode {
    match kind % 4 {
        0 => ternary(var("flag"), node, string("fallback")),
        1 => cast("string", node),
        2 => list(vec![int(1), node]),
        _ => binary("+", int(2), node),
    }
}

fn wrapped(core: SyntaxNode, wrappers: &[u8]) -> SyntaxNode {
    wrappers.iter().fold(core, |acc, k| wrap(acc, *k))
}

proptest! {
    #[test]
    fn concatenation_found_through_any_wrappers(wrappers in prop::collection::vec(any::<u8>(), 0..48)) {
        let tree = wrapped(concat(string("SELECT "), var("id")), &wrappers);
        prop_assert!(contains_concatenation(&tree));
        let hit = find_first_vulnerable_node(&tree).map(|n| n.kind());
        prop_assert_eq!(hit, Some(NodeKind::Concat));
    }

    #[test]
    fn wrappers_alone_are_not_concatenation(wrappers in prop::collection::vec(any::<u8>(), 0..48)) {
        let tree = wrapped(var("id"), &wrappers);
        prop_assert!(!contains_concatenation(&tree));
        prop_assert!(find_first_vulnerable_node(&tree).is_none());
    }

    #[test]
    fn interpolation_detected_like_concatenation(wrappers in prop::collection::vec(any::<u8>(), 0..48)) {
        let interp = wrapped(interpolated(vec![string("id = "), var("id")]), &wrappers);
        let conc = wrapped(concat(string("id = "), var("id")), &wrappers);
        prop_assert!(contains_interpolated_string(&interp));
        prop_assert!(!contains_concatenation(&interp));
        prop_assert_eq!(
            find_first_vulnerable_node(&interp).is_some(),
            find_first_vulnerable_node(&conc).is_some()
        );
        prop_assert_eq!(
            find_first_vulnerable_node(&interp).map(|n| n.kind()),
            Some(NodeKind::InterpolatedString)
        );
    }
}

#[test]
fn first_vulnerable_node_is_leftmost() {
    let tree = binary(
        "&&",
        at_line(concat(var("a"), var("b")), 2),
        at_line(interpolated(vec![var("c")]), 3),
    );
    assert_eq!(find_first_vulnerable_node(&tree).map(|n| n.span.line), Some(2));
}

#[test]
fn argument_scoped_accessor_is_not_tainted() {
    let sources = InputSources::default();
    let scoped = method(call("request", vec![]), "input", vec![string("name")]);
    assert!(find_first_tainted_input_node(&scoped, &sources).is_none());

    let raw = method(call("request", vec![]), "input", vec![]);
    let hit = find_first_tainted_input_node(&raw, &sources).unwrap();
    assert_eq!(hit.call_name(), Some("input"));
}

#[test]
fn request_holders_and_facades() {
    let sources = InputSources::default();
    for tainted in [
        method(var("request"), "all", vec![]),
        method(prop(var("this"), "request"), "ALL", vec![]),
        static_call("Request", "all", vec![]),
        static_call("\\Illuminate\\Support\\Facades\\Input", "all", vec![]),
        method(var("request"), "getContent", vec![]),
    ] {
        assert!(
            find_first_tainted_input_node(&tainted, &sources).is_some(),
            "{tainted:?}"
        );
    }
    for clean in [
        method(var("user"), "all", vec![]),
        method(call("request", vec![string("q")]), "all", vec![]),
        static_call("Request", "input", vec![string("email")]),
        method(var("request"), "validated", vec![]),
    ] {
        assert!(
            find_first_tainted_input_node(&clean, &sources).is_none(),
            "{clean:?}"
        );
    }
}

#[test]
fn superglobals_are_tainted() {
    let sources = InputSources::default();
    let access = call("mysql_query", vec![concat(string("x"), index(var("_GET"), string("id")))]);
    let hit = find_first_tainted_input_node(&access, &sources).unwrap();
    assert_eq!(hit.kind(), NodeKind::ArrayAccess);

    let bare = call("extract", vec![var("_POST")]);
    assert_eq!(
        find_first_tainted_input_node(&bare, &sources).map(|n| n.kind()),
        Some(NodeKind::Variable)
    );
    assert!(find_first_tainted_input_node(&var("_ENV"), &sources).is_none());
}

#[test]
fn registry_is_extensible() {
    let sources = InputSources::default()
        .with_input_method("validated")
        .with_superglobal("$_ENV")
        .with_request_facade("Req");
    assert!(sources.is_tainted(&method(var("request"), "validated", vec![])));
    assert!(sources.is_tainted(&var("_ENV")));
    assert!(sources.is_tainted(&static_call("Req", "all", vec![])));
}

#[test]
fn matcher_reuses_results_across_calls() {
    let tree = list(vec![concat(var("a"), var("b")), var("c")]);
    let sources = InputSources::default();
    let mut matcher = Matcher::new(&sources);
    assert!(matcher.contains_concatenation(&tree));
    assert!(matcher.contains_concatenation(&tree));
    let children = tree.children();
    assert!(matcher.contains_concatenation(children[0]));
    assert!(!matcher.contains_concatenation(children[1]));
    assert!(!matcher.contains_tainted_input(&tree));
}

fn builder_method(name: &str) -> bool {
    matches!(name, "where" | "orderBy" | "update" | "whereRaw")
}

fn is_db_table(node: &SyntaxNode) -> bool {
    matches!(&node.node, Node::StaticCall { class, name, .. } if class == "DB" && name == "table")
}

#[test]
fn fluent_chain_rooted_at_query_builder() {
    let chain = method(
        method(
            static_call("DB", "table", vec![string("users")]),
            "where",
            vec![string("id"), int(1)],
        ),
        "update",
        vec![list(vec![])],
    );
    assert!(is_fluent_chain_rooted_at(&chain, builder_method, is_db_table));

    let model = method(var("user"), "update", vec![list(vec![])]);
    assert!(!is_fluent_chain_rooted_at(&model, builder_method, is_db_table));

    // an unknown link stops the walk before the root
    let broken = method(
        method(static_call("DB", "table", vec![]), "paginate", vec![]),
        "update",
        vec![],
    );
    assert!(!is_fluent_chain_rooted_at(&broken, builder_method, is_db_table));
}

#[test]
fn overlong_chain_is_not_matched() {
    let mut node = static_call("DB", "table", vec![]);
    for _ in 0..MAX_CHAIN_DEPTH + 5 {
        node = method(node, "where", vec![]);
    }
    assert!(!is_fluent_chain_rooted_at(&node, builder_method, is_db_table));
    assert_eq!(chain_calls(&node).len(), MAX_CHAIN_DEPTH);

    let mut short = static_call("DB", "table", vec![]);
    for _ in 0..10 {
        short = method(short, "where", vec![]);
    }
    assert!(is_fluent_chain_rooted_at(&short, builder_method, is_db_table));
    assert_eq!(chain_calls(&short).len(), 10);
}

#[test]
fn name_resolver_follows_aliases() {
    let mut file = FileAst::new("app/Http/Controllers/UserController.php".into());
    file.push(SyntaxNode::new(
        Span::at(3),
        Node::Use {
            path: "Illuminate\\Support\\Facades\\DB".into(),
            alias: Some("Database".into()),
        },
    ));
    file.push(SyntaxNode::new(
        Span::at(4),
        Node::Use {
            path: "App\\Support\\Helpers".into(),
            alias: Some("H".into()),
        },
    ));
    let names = NameResolver::for_file(["DB", "Illuminate\\Support\\Facades\\Hash"], &file);
    assert!(names.matches("DB", "DB"));
    assert!(names.matches("\\Illuminate\\Support\\Facades\\DB", "DB"));
    assert!(names.matches("Database", "DB"));
    assert!(names.matches("hash", "Hash"));
    assert!(!names.is_known("H"));
    assert!(!names.matches("Database", "Hash"));
}
