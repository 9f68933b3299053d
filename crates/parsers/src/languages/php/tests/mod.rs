use super::parse_php;
use ir::{find_classes, find_function_calls, find_method_calls_by_name, find_static_calls};
use ir::{FileAst, Node, NodeKind, SyntaxNode};

fn parse(code: &str) -> FileAst {
    parse_php(code, "<mem>").expect("parse php snippet")
}

fn contains_kind(node: &SyntaxNode, kind: NodeKind) -> bool {
    node.walk().any(|n| n.kind() == kind)
}

#[test]
fn query_builder_chain_with_concatenation() {
    let ast = parse(
        r#"<?php
$users = DB::table('users')->whereRaw("id = " . $id)->get();
"#,
    );
    assert!(!ast.has_errors);
    assert_eq!(ast.nodes.len(), 1);
    assert_eq!(ast.nodes[0].kind(), NodeKind::Assignment);

    let raw = find_method_calls_by_name(&ast.nodes, "whereRaw");
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].call_args()[0].kind(), NodeKind::Concat);
    assert_eq!(raw[0].span.line, 2);

    let table = find_static_calls(&ast.nodes, "DB", "table");
    assert_eq!(table.len(), 1);
    assert_eq!(table[0].call_args()[0].as_str(), Some("users"));
}

#[test]
fn double_quoted_strings_with_and_without_variables() {
    let ast = parse(
        r#"<?php
DB::select("SELECT * FROM users WHERE id = $id");
DB::select("SELECT 1");
DB::select('it\'s');
"#,
    );
    let selects = find_static_calls(&ast.nodes, "DB", "select");
    assert_eq!(selects.len(), 3);
    let first = &selects[0].call_args()[0];
    assert_eq!(first.kind(), NodeKind::InterpolatedString);
    assert!(first
        .walk()
        .any(|n| matches!(&n.node, Node::Variable { name } if name == "id")));
    assert_eq!(selects[1].call_args()[0].as_str(), Some("SELECT 1"));
    assert_eq!(selects[2].call_args()[0].as_str(), Some("it's"));
}

#[test]
fn concat_assignment_becomes_concatenation() {
    let ast = parse(
        r#"<?php
$sql = 'SELECT * FROM t WHERE a = ';
$sql .= $input;
"#,
    );
    match &ast.nodes[1].node {
        Node::Assignment { target, value } => {
            assert!(matches!(&target.node, Node::Variable { name } if name == "sql"));
            assert_eq!(value.kind(), NodeKind::Concat);
        }
        other => panic!("unexpected node {other:?}"),
    }
}

#[test]
fn model_class_declaration() {
    let ast = parse(
        r#"<?php
namespace App\Models;

use Illuminate\Database\Eloquent\Model;
use Illuminate\Support\Facades\Hash as H;

class User extends Model
{
    protected $fillable = ['name', 'email'];
    protected static $booted;

    public function setPassword($value)
    {
        $this->attributes['password'] = H::make($value);
    }
}
"#,
    );
    assert_eq!(ast.namespace(), Some("App\\Models"));
    let imports = ast.imports();
    assert!(imports.contains(&(
        "Model".to_string(),
        "Illuminate\\Database\\Eloquent\\Model".to_string()
    )));
    assert!(imports.contains(&("H".to_string(), "Illuminate\\Support\\Facades\\Hash".to_string())));

    let classes = find_classes(&ast.nodes);
    assert_eq!(classes.len(), 1);
    let Node::Class {
        name,
        extends,
        members,
        ..
    } = &classes[0].node
    else {
        panic!("not a class");
    };
    assert_eq!(name, "User");
    assert_eq!(extends.as_deref(), Some("Model"));
    assert_eq!(classes[0].span.line, 7);

    let props: Vec<(&str, bool, Option<&SyntaxNode>)> = members
        .iter()
        .filter_map(|m| match &m.node {
            Node::Property {
                name,
                is_static,
                default,
            } => Some((name.as_str(), *is_static, default.as_deref())),
            _ => None,
        })
        .collect();
    assert_eq!(props.len(), 2);
    assert_eq!(props[0].0, "fillable");
    assert!(!props[0].1);
    match props[0].2.map(|d| &d.node) {
        Some(Node::ArrayLiteral { items }) => assert_eq!(items.len(), 2),
        other => panic!("unexpected default {other:?}"),
    }
    assert_eq!(props[1].0, "booted");
    assert!(props[1].1);

    let method = members
        .iter()
        .find(|m| matches!(&m.node, Node::Method { name, .. } if name == "setPassword"))
        .expect("method");
    match &method.node {
        Node::Method { params, .. } => assert_eq!(params, &vec!["value".to_string()]),
        _ => unreachable!(),
    }
    assert_eq!(find_static_calls(&ast.nodes, "H", "make").len(), 1);
}

#[test]
fn superglobal_subscript() {
    let ast = parse("<?php\n$id = $_GET['id'];\n");
    match &ast.nodes[0].node {
        Node::Assignment { value, .. } => match &value.node {
            Node::ArrayAccess { base, key } => {
                assert!(matches!(&base.node, Node::Variable { name } if name == "_GET"));
                assert_eq!(key.as_ref().and_then(|k| k.as_str()), Some("id"));
            }
            other => panic!("unexpected value {other:?}"),
        },
        other => panic!("unexpected node {other:?}"),
    }
}

#[test]
fn password_hash_arguments() {
    let ast = parse("<?php\n$h = password_hash($p, PASSWORD_BCRYPT, ['cost' => 12]);\n");
    let calls = find_function_calls(&ast.nodes, "password_hash");
    assert_eq!(calls.len(), 1);
    let args = calls[0].call_args();
    assert_eq!(args.len(), 3);
    assert!(matches!(&args[1].node, Node::ConstantRef { name } if name == "PASSWORD_BCRYPT"));
    assert_eq!(args[2].array_get("cost").and_then(|n| n.as_int()), Some(12));
}

#[test]
fn echo_arguments_are_flattened() {
    let ast = parse("<?php\necho $a, \"b\";\n");
    let echo = find_function_calls(&ast.nodes, "echo");
    assert_eq!(echo.len(), 1);
    assert_eq!(echo[0].call_args().len(), 2);
}

#[test]
fn route_closure_and_middleware() {
    let ast = parse(
        r#"<?php
Route::get('/', function () {
    return view('welcome');
})->middleware('auth');
"#,
    );
    let mw = find_method_calls_by_name(&ast.nodes, "middleware");
    assert_eq!(mw.len(), 1);
    match &mw[0].node {
        Node::MethodCall { receiver, args, .. } => {
            assert_eq!(args[0].as_str(), Some("auth"));
            assert_eq!(receiver.kind(), NodeKind::StaticCall);
            assert!(contains_kind(receiver, NodeKind::Closure));
            assert!(contains_kind(receiver, NodeKind::Return));
        }
        _ => unreachable!(),
    }
    let view = find_function_calls(&ast.nodes, "view");
    assert_eq!(view[0].span.line, 3);
}

#[test]
fn object_creation_ternary_and_cast() {
    let ast = parse("<?php\n$pdo = new PDO($dsn);\n$v = $a ? $b : (string) $c;\n");
    match &ast.nodes[0].node {
        Node::Assignment { value, .. } => match &value.node {
            Node::New { class, args } => {
                assert_eq!(class, "PDO");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
    match &ast.nodes[1].node {
        Node::Assignment { value, .. } => match &value.node {
            Node::Ternary {
                then, otherwise, ..
            } => {
                assert!(then.is_some());
                assert!(matches!(&otherwise.node, Node::Cast { ty, .. } if ty == "string"));
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn syntax_errors_are_tolerated() {
    let ast = parse("<?php\n$x = ;\nfoo(\n");
    assert!(ast.has_errors);
}

#[test]
fn inline_html_and_comments_are_dropped() {
    let ast = parse("<html>\n<?php // note\n/* block */\nfoo();\n?>\n</html>\n");
    assert_eq!(find_function_calls(&ast.nodes, "foo").len(), 1);
    assert!(ast
        .walk()
        .all(|n| !matches!(&n.node, Node::Other { kind, .. } if kind == "comment")));
}

#[test]
fn deep_nesting_is_truncated() {
    let depth = crate::MAX_LOWERING_DEPTH + 100;
    let code = format!("<?php\n$x = {}1{};\n", "(".repeat(depth), ")".repeat(depth));
    let ast = parse(&code);
    assert!(ast
        .walk()
        .any(|n| matches!(&n.node, Node::Other { kind, .. } if kind == "truncated")));
}

#[test]
fn parse_file_skips_blade_templates() {
    let dir = tempfile::tempdir().unwrap();
    let blade = dir.path().join("home.blade.php");
    std::fs::write(&blade, "{!! $html !!}").unwrap();
    assert!(crate::parse_file(&blade, None).unwrap().is_none());

    let php = dir.path().join("web.php");
    std::fs::write(&php, "<?php\nRoute::get('/', 'HomeController@index');\n").unwrap();
    let mut metrics = crate::ParserMetrics::default();
    let ast = crate::parse_file(&php, Some(&mut metrics)).unwrap().unwrap();
    assert_eq!(metrics.files_parsed, 1);
    assert_eq!(metrics.parse_errors, 0);
    assert_eq!(find_static_calls(&ast.nodes, "Route", "get").len(), 1);
}
