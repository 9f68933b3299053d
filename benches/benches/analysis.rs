use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::{Engine, EngineConfig, ScanContext};
use loader::ScanConfig;
use parsers::parse_php;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const ACTIONS: usize = 40;

/// Controller with `ACTIONS` methods mixing safe and raw queries.
fn controller_source() -> String {
    let mut src = String::from(
        "<?php\n\nnamespace App\\Http\\Controllers;\n\nuse Illuminate\\Support\\Facades\\DB;\n\nclass ReportController extends Controller\n{\n",
    );
    for i in 0..ACTIONS {
        src.push_str(&format!(
            "    public function action{i}(Request $request)\n    {{\n        $rows = DB::select('select * from t{i} where id = ?', [$request->id]);\n        $raw = DB::select(\"select * from t{i} where name = '\" . $request->input('name') . \"'\");\n        User::where('team', $request->team)->orderByRaw(\"created_at {{$request->dir}}\")->get();\n        return view('reports.show', ['rows' => $rows, 'raw' => $raw]);\n    }}\n\n"
        ));
    }
    src.push_str("}\n");
    src
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("relative path has a parent")).expect("create dir");
    fs::write(path, content).expect("write fixture");
}

fn bench_parser(c: &mut Criterion) {
    let src = controller_source();
    c.bench_function("parse_php_controller", |b| {
        b.iter(|| parse_php(black_box(&src), "ReportController.php").expect("parse"))
    });
}

fn bench_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    for i in 0..10 {
        write(
            root,
            &format!("app/Http/Controllers/Report{i}Controller.php"),
            &controller_source(),
        );
    }
    write(
        root,
        "routes/web.php",
        "<?php\n\nRoute::middleware('auth')->group(function () {\n    Route::post('/reports', [ReportController::class, 'store']);\n});\nRoute::post('/feedback', [FeedbackController::class, 'store']);\n",
    );
    write(root, ".env", "APP_ENV=production\nAPP_DEBUG=true\nAPP_KEY=\n");
    write(
        root,
        "resources/views/reports/show.blade.php",
        "<form method=\"POST\" action=\"/reports\">\n{!! $raw !!}\n</form>\n",
    );

    let config = ScanConfig::default();
    let engine = Engine::new(analyzers::default_rules(&config), EngineConfig::default())
        .expect("engine");
    c.bench_function("scan_project", |b| {
        b.iter(|| {
            let ctx = ScanContext::discover(root, config.clone()).expect("discover");
            engine.run(Arc::new(black_box(ctx)))
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_parser, bench_scan
}
criterion_main!(benches);
