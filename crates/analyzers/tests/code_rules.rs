mod common;

use analyzers::rules::{MassAssignment, PasswordHashing, SqlInjection};
use common::{project, scan, severities, with_message};
use engine::{Outcome, Severity};
use loader::RuleOptions;

const CONTROLLER: &str = "app/Http/Controllers/UserController.php";

fn controller(body: &str) -> String {
    format!(
        "<?php\n\nnamespace App\\Http\\Controllers;\n\nclass UserController extends Controller\n{{\n    public function store(Request $request)\n    {{\n{body}\n    }}\n}}\n"
    )
}

#[test]
fn password_hash_without_algorithm_is_critical() {
    let dir = project(&[(CONTROLLER, &controller("        $hash = password_hash($request->password);"))]);
    let outcome = scan(&PasswordHashing::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());
    let hits = with_message(&outcome, "weak or unknown algorithm");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].severity, Severity::Critical);
    assert_eq!(hits[0].line(), 9);
    assert_eq!(hits[0].file(), std::path::Path::new(CONTROLLER));
}

#[test]
fn password_hashing_costs_and_digests() {
    let body = [
        "        $a = password_hash($p, PASSWORD_BCRYPT, ['cost' => 8]);",
        "        $b = md5($request->input('password'));",
        "        $c = Hash::make($p, ['rounds' => 12]);",
        "        $d = md5($user->email);",
    ]
    .join("\n");
    let dir = project(&[(CONTROLLER, &controller(&body))]);
    let outcome = scan(&PasswordHashing::new(&RuleOptions::new()), dir.path());
    let mut found = severities(&outcome);
    found.sort();
    assert_eq!(found, vec![Severity::Medium, Severity::Critical]);
    assert_eq!(with_message(&outcome, "cost 8").len(), 1);
    assert_eq!(with_message(&outcome, "md5").len(), 1);
}

#[test]
fn hashing_config_rounds_use_configured_minimum() {
    let config = "<?php\n\nreturn [\n    'driver' => 'bcrypt',\n    'bcrypt' => [\n        'rounds' => env('BCRYPT_ROUNDS', 10),\n    ],\n];\n";
    let dir = project(&[("config/hashing.php", config)]);

    let outcome = scan(&PasswordHashing::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_passed(), "{outcome}");

    let strict = PasswordHashing::new(&RuleOptions::new().with("min_bcrypt_cost", 12));
    let outcome = scan(&strict, dir.path());
    let hits = with_message(&outcome, "config/hashing.php");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].severity, Severity::Medium);
    assert_eq!(hits[0].line(), 6);
}

#[test]
fn mass_assignment_blacklist_and_raw_input() {
    let body = [
        "        User::create(request()->except(['is_admin']));",
        "        User::create(request()->all());",
        "        User::create($request->validated());",
    ]
    .join("\n");
    let dir = project(&[(CONTROLLER, &controller(&body))]);
    let outcome = scan(&MassAssignment::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());

    let blacklist = with_message(&outcome, "blacklist filtering");
    assert_eq!(blacklist.len(), 1);
    assert_eq!(blacklist[0].severity, Severity::High);
    assert_eq!(blacklist[0].line(), 9);

    let raw = with_message(&outcome, "unfiltered request input");
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].severity, Severity::Critical);
    assert!(raw[0].message.contains("request()->all()"));
    assert_eq!(outcome.findings().len(), 2);
}

#[test]
fn model_without_fillable_or_with_empty_guarded() {
    let open = "<?php\n\nnamespace App\\Models;\n\nclass Post extends Model\n{\n    protected $guarded = [];\n}\n";
    let bare = "<?php\n\nnamespace App\\Models;\n\nclass Tag extends Model\n{\n}\n";
    let safe = "<?php\n\nnamespace App\\Models;\n\nclass User extends Authenticatable\n{\n    protected $fillable = ['name', 'email'];\n}\n";
    let dir = project(&[
        ("app/Models/Post.php", open),
        ("app/Models/Tag.php", bare),
        ("app/Models/User.php", safe),
    ]);
    let outcome = scan(&MassAssignment::new(&RuleOptions::new()), dir.path());
    let guarded = with_message(&outcome, "$guarded = []");
    assert_eq!(guarded.len(), 1);
    assert_eq!(guarded[0].severity, Severity::High);
    assert_eq!(guarded[0].line(), 7);
    let bare = with_message(&outcome, "neither $fillable nor $guarded");
    assert_eq!(bare.len(), 1);
    assert_eq!(bare[0].severity, Severity::Medium);
    assert_eq!(outcome.findings().len(), 2);
}

#[test]
fn model_checks_can_be_disabled() {
    let bare = "<?php\n\nclass Tag extends Model\n{\n}\n";
    let dir = project(&[("app/Models/Tag.php", bare)]);
    let rule = MassAssignment::new(&RuleOptions::new().with("check_models", false));
    assert!(scan(&rule, dir.path()).is_passed());
}

#[test]
fn sql_built_from_strings() {
    let body = [
        "        DB::select(\"select * from users where id = \" . $id);",
        "        DB::select('select * from users where id = ?', [$id]);",
        "        DB::statement(\"delete from posts where slug = '{$_GET['slug']}'\");",
        "        $sql = 'update users set name = ' . $name;",
        "        DB::unprepared($sql);",
        "        User::where('active', 1)->whereRaw(\"name = '$name'\")->get();",
        "        $collection->whereRaw(\"x = $y\");",
    ]
    .join("\n");
    let dir = project(&[(CONTROLLER, &controller(&body))]);
    let outcome = scan(&SqlInjection::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());

    let lines: Vec<usize> = outcome.findings().iter().map(|f| f.line()).collect();
    assert_eq!(lines, vec![9, 11, 13, 14]);
    let critical: Vec<_> = outcome
        .findings()
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].line(), 11);
    assert!(critical[0].message.contains("interpolation"));
    assert!(outcome.findings()[0].message.contains("concatenation"));
}

#[test]
fn db_facade_alias_is_resolved() {
    let src = "<?php\n\nuse Illuminate\\Support\\Facades\\DB as Database;\n\nDatabase::select('select * from t where a = ' . $a);\n";
    let dir = project(&[("app/Services/Report.php", src)]);
    let outcome = scan(&SqlInjection::new(&RuleOptions::new()), dir.path());
    assert_eq!(outcome.findings().len(), 1);
    assert_eq!(outcome.findings()[0].line(), 5);
}

#[test]
fn rules_skip_projects_without_php() {
    let dir = project(&[("README.md", "# app\n")]);
    for outcome in [
        scan(&SqlInjection::new(&RuleOptions::new()), dir.path()),
        scan(&MassAssignment::new(&RuleOptions::new()), dir.path()),
        scan(&PasswordHashing::new(&RuleOptions::new()), dir.path()),
    ] {
        assert!(matches!(outcome, Outcome::Skipped { .. }), "{outcome}");
    }
}

#[test]
fn execute_is_idempotent() {
    let dir = project(&[(CONTROLLER, &controller("        User::create(request()->all());"))]);
    let rule = MassAssignment::new(&RuleOptions::new());
    let first = scan(&rule, dir.path());
    let second = scan(&rule, dir.path());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
