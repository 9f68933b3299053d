mod common;

use common::context;
use engine::ScanContext;
use loader::ScanConfig;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn parse_cache_returns_the_same_tree() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("routes")).unwrap();
    let web = dir.path().join("routes/web.php");
    fs::write(&web, "<?php\nRoute::post('/login', 'AuthController@login');\n").unwrap();

    let ctx = context(dir.path());
    let first = ctx.ast(&web).unwrap();
    let second = ctx.ast(&web).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.parser_metrics().files_parsed, 1);
    assert!(!first.nodes.is_empty());
}

#[test]
fn non_php_and_missing_files_have_no_tree() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("resources/views")).unwrap();
    let view = dir.path().join("resources/views/home.blade.php");
    fs::write(&view, "<form method=\"POST\"></form>").unwrap();

    let ctx = context(dir.path());
    assert!(ctx.ast(&view).is_none());
    assert!(ctx.ast(&dir.path().join("routes/missing.php")).is_none());
    assert!(ctx.read(&dir.path().join("routes/missing.php")).is_none());
}

#[test]
fn discover_applies_configured_excludes() {
    let dir = tempdir().unwrap();
    for rel in ["app/Models/User.php", "legacy/Old.php", "vendor/x/Y.php"] {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<?php\n").unwrap();
    }
    fs::write(dir.path().join(".env"), "APP_KEY=\nAPP_DEBUG=true\n").unwrap();
    let config = ScanConfig {
        exclude: vec!["legacy/".into()],
        ..Default::default()
    };
    let ctx = ScanContext::discover(dir.path(), config).unwrap();
    assert_eq!(ctx.files().php_files().len(), 1);
    assert!(ctx.is_excluded(&dir.path().join("legacy/Old.php")));
    assert_eq!(
        ctx.relative(&dir.path().join("app/Models/User.php")),
        Path::new("app/Models/User.php")
    );

    let env = ctx.env(&ctx.files().env[0]).unwrap();
    assert_eq!(env.get("APP_DEBUG").map(|e| e.value.as_str()), Some("true"));
    assert_eq!(env.get("APP_KEY").map(|e| e.line), Some(1));
}
