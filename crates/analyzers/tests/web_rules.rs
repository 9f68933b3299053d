mod common;

use analyzers::rules::{AuthMiddleware, CsrfProtection, SecurityHeaders, UnescapedOutput};
use common::{project, scan, with_message};
use engine::{Outcome, Severity};
use loader::RuleOptions;
use serde_json::json;

const CSRF_MIDDLEWARE: &str = "<?php

namespace App\\Http\\Middleware;

use Illuminate\\Foundation\\Http\\Middleware\\VerifyCsrfToken as Middleware;

class VerifyCsrfToken extends Middleware
{
    protected $except = [
        'stripe/webhook',
        'api/*',
    ];
}
";

#[test]
fn csrf_exemptions() {
    let dir = project(&[("app/Http/Middleware/VerifyCsrfToken.php", CSRF_MIDDLEWARE)]);
    let outcome = scan(&CsrfProtection::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());
    let findings = outcome.findings();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].severity, Severity::Low);
    assert_eq!(findings[0].line(), 10);
    assert_eq!(findings[1].severity, Severity::High);
    assert!(findings[1].message.contains("'api/*'"));
}

#[test]
fn csrf_forms() {
    let view = r#"<div>
<form method="POST" action="/profile">
    <input name="name">
</form>

<form method="post" action="/settings">
    @csrf
    <button>Save</button>
</form>

<form action="/search">
    <input name="q">
</form>

<form method="POST" action="https://payments.example.com/checkout">
</form>

<form
    method="DELETE"
    action="/posts/1">
    {{ csrf_field() }}
</form>
</div>
"#;
    let dir = project(&[("resources/views/profile/edit.blade.php", view)]);
    let outcome = scan(&CsrfProtection::new(&RuleOptions::new()), dir.path());
    let findings = outcome.findings();
    assert_eq!(findings.len(), 1, "{findings:?}");
    assert_eq!(findings[0].line(), 2);
    assert_eq!(findings[0].message, "POST form without a CSRF token");
    assert_eq!(
        findings[0].file(),
        std::path::Path::new("resources/views/profile/edit.blade.php")
    );
}

#[test]
fn csrf_form_tag_with_blade_arrow() {
    let view = "<form action=\"{{ route('posts.update', ['post' => $post]) }}\" method=\"POST\">\n    <input name=\"title\">\n</form>\n";
    let dir = project(&[("resources/views/posts/edit.blade.php", view)]);
    let outcome = scan(&CsrfProtection::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());
    let findings = outcome.findings();
    assert_eq!(findings.len(), 1, "{findings:?}");
    assert_eq!(findings[0].severity, Severity::High);
    assert_eq!(findings[0].line(), 1);
    assert_eq!(findings[0].message, "POST form without a CSRF token");
}

#[test]
fn csrf_skipped_without_views_or_middleware() {
    let dir = project(&[("routes/web.php", "<?php\n")]);
    let outcome = scan(&CsrfProtection::new(&RuleOptions::new()), dir.path());
    assert!(matches!(outcome, Outcome::Skipped { .. }));
}

const ROUTES: &str = "<?php

use App\\Http\\Controllers\\PostController;
use Illuminate\\Support\\Facades\\Route;

Route::get('/', [PostController::class, 'index']);
Route::post('/login', [AuthController::class, 'login']);
Route::post('/comments', [CommentController::class, 'store']);

Route::middleware(['auth'])->group(function () {
    Route::post('/posts', [PostController::class, 'store']);
    Route::prefix('admin')->group(function () {
        Route::delete('/users/{id}', [UserController::class, 'destroy']);
    });
});

Route::group(['prefix' => 'admin'], function () {
    Route::put('/settings', [SettingsController::class, 'update']);
    Route::post('/roles', [RoleController::class, 'store'])->middleware('auth:sanctum');
});

Route::middleware('guest')->group(function () {
    Route::post('/register', [RegisterController::class, 'store']);
    Route::post('/invites/accept', [InviteController::class, 'accept']);
});

Route::resource('photos', PhotoController::class);
";

const PHOTO_CONTROLLER: &str = "<?php

namespace App\\Http\\Controllers;

class PhotoController extends Controller
{
    public function __construct()
    {
        $this->middleware('auth');
    }
}
";

#[test]
fn unprotected_state_changing_routes() {
    let dir = project(&[
        ("routes/web.php", ROUTES),
        ("app/Http/Controllers/PhotoController.php", PHOTO_CONTROLLER),
    ]);
    let outcome = scan(&AuthMiddleware::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());
    let findings = outcome.findings();
    let uris: Vec<&str> = findings
        .iter()
        .map(|f| f.metadata["uri"].as_str().unwrap())
        .collect();
    assert_eq!(uris, vec!["/comments", "/admin/settings"]);
    assert_eq!(findings[0].severity, Severity::Medium);
    assert_eq!(findings[0].line(), 8);
    assert_eq!(findings[1].severity, Severity::High);
    assert_eq!(findings[1].message, "PUT /admin/settings is not behind authentication middleware");
}

#[test]
fn warns_when_no_route_is_protected() {
    let routes = "<?php\n\nRoute::get('/', fn () => view('welcome'));\nRoute::post('/contact', [ContactController::class, 'send']);\n";
    let dir = project(&[("routes/web.php", routes)]);
    let outcome = scan(&AuthMiddleware::new(&RuleOptions::new()), dir.path());
    let findings = outcome.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Low);
    assert!(findings[0].message.contains("None of the 2 routes"));

    let quiet = AuthMiddleware::new(&RuleOptions::new().with("warn_unprotected_app", false));
    assert!(scan(&quiet, dir.path()).is_passed());
}

#[test]
fn raw_blade_echoes() {
    let view = "<h1>{{ $title }}</h1>\n<div>{!! $post->body_html !!}</div>\n<p>{!! request('q') !!}</p>\n{!! csrf_field() !!}\n";
    let dir = project(&[("resources/views/posts/show.blade.php", view)]);
    let outcome = scan(&UnescapedOutput::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_failed());
    let findings = outcome.findings();
    assert_eq!(findings.len(), 2);
    assert_eq!((findings[0].line(), findings[0].severity), (2, Severity::Medium));
    assert_eq!((findings[1].line(), findings[1].severity), (3, Severity::High));
    assert_eq!(findings[1].metadata["expression"], json!("request('q')"));
}

#[test]
fn repeated_echoes_on_one_line_are_counted_apart() {
    let view = "<p>{!! $bio !!} {!! $bio !!}</p>\n{!! $slotHtml !!}\n{!! $slot !!}\n";
    let dir = project(&[("resources/views/users/show.blade.php", view)]);
    let outcome = scan(&UnescapedOutput::new(&RuleOptions::new()), dir.path());
    let findings = outcome.findings();
    let positions: Vec<(usize, Option<usize>)> = findings
        .iter()
        .map(|f| (f.line(), f.location.column))
        .collect();
    assert_eq!(positions, vec![(1, Some(4)), (1, Some(17)), (2, Some(1))]);
    assert_eq!(outcome.message(), "3 unescaped echo(es) in Blade templates");
}

#[test]
fn missing_security_headers() {
    let middleware = "<?php\n\nclass SecureHeaders\n{\n    public function handle($request, $next)\n    {\n        $response = $next($request);\n        $response->headers->set('X-Frame-Options', 'DENY');\n        $response->headers->set('X-Content-Type-Options', 'nosniff');\n        return $response;\n    }\n}\n";
    let dir = project(&[
        ("app/Http/Middleware/SecureHeaders.php", middleware),
        ("app/Http/Kernel.php", "<?php\n\nclass Kernel\n{\n}\n"),
    ]);
    let outcome = scan(&SecurityHeaders::new(&RuleOptions::new()), dir.path());
    let headers: Vec<&str> = outcome
        .findings()
        .iter()
        .map(|f| f.metadata["header"].as_str().unwrap())
        .collect();
    assert_eq!(
        headers,
        vec!["Strict-Transport-Security", "Content-Security-Policy", "Referrer-Policy"]
    );
    assert!(outcome
        .findings()
        .iter()
        .all(|f| f.file() == std::path::Path::new("app/Http/Kernel.php")));
    assert_eq!(outcome.max_severity(), Some(Severity::Medium));
}

#[test]
fn header_packages_cover_headers() {
    let composer = json!({"require": {"bepsvpt/secure-headers": "^8.0"}}).to_string();
    let dir = project(&[("composer.json", &composer), ("routes/web.php", "<?php\n")]);
    let outcome = scan(&SecurityHeaders::new(&RuleOptions::new()), dir.path());
    assert!(outcome.is_passed(), "{outcome}");
}

#[test]
fn credentialed_wildcard_cors() {
    let cors = "<?php\n\nreturn [\n    'paths' => ['api/*'],\n    'allowed_origins' => ['*'],\n    'supports_credentials' => true,\n];\n";
    let options = RuleOptions::new().with(
        "ignore_headers",
        json!([
            "X-Frame-Options",
            "X-Content-Type-Options",
            "Strict-Transport-Security",
            "Content-Security-Policy",
            "Referrer-Policy"
        ]),
    );
    let dir = project(&[("config/cors.php", cors)]);
    let outcome = scan(&SecurityHeaders::new(&options), dir.path());
    let hits = with_message(&outcome, "any origin");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].severity, Severity::High);
    assert_eq!(hits[0].line(), 6);
    assert_eq!(outcome.findings().len(), 1);
}
