use parsers::{detect_type, parse_file, ParserMetrics};
use std::path::Path;
use tempfile::tempdir;

#[test]
fn detects_laravel_file_types() {
    assert_eq!(detect_type(Path::new("app/Models/User.php")), Some("php"));
    assert_eq!(detect_type(Path::new("views/welcome.blade.php")), Some("blade"));
    assert_eq!(detect_type(Path::new(".env")), Some("env"));
    assert_eq!(detect_type(Path::new("composer.lock")), Some("json"));
    assert_eq!(detect_type(Path::new("logo.png")), None);
}

#[test]
fn parses_php_and_counts_metrics() {
    let dir = tempdir().unwrap();
    let ok = dir.path().join("Ok.php");
    std::fs::write(&ok, "<?php\n$a = 1;\n$b = foo($a);\n").unwrap();
    let broken = dir.path().join("Broken.php");
    std::fs::write(&broken, "<?php\nfunction (\n").unwrap();

    let mut metrics = ParserMetrics::default();
    let ast = parse_file(&ok, Some(&mut metrics)).unwrap().unwrap();
    assert_eq!(ast.nodes.len(), 2);
    assert!(!ast.has_errors);

    let ast = parse_file(&broken, Some(&mut metrics)).unwrap().unwrap();
    assert!(ast.has_errors);
    assert_eq!(metrics.files_parsed, 2);
    assert_eq!(metrics.parse_errors, 1);
}

#[test]
fn blade_templates_are_not_parsed_as_php() {
    let dir = tempdir().unwrap();
    let view = dir.path().join("home.blade.php");
    std::fs::write(&view, "<h1>{{ $title }}</h1>\n").unwrap();
    assert!(parse_file(&view, None).unwrap().is_none());
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = parse_file(&dir.path().join("Gone.php"), None).unwrap_err();
    assert!(err.to_string().contains("Failed to read file"));
}
