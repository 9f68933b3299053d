//! Built-in rule catalog and the data lists the rules work from. Every
//! list can be replaced through the rule's options in the config file.

use crate::rules::{
    AppKey, AuthMiddleware, CsrfProtection, DebugMode, DependencyHygiene, MassAssignment,
    PasswordHashing, SecurityHeaders, SessionSecurity, SqlInjection, UnescapedOutput,
};
use engine::Rule;
use loader::ScanConfig;
use std::sync::Arc;
use tracing::debug;

/// Base URL of the rule documentation.
pub const DOCS_BASE: &str = "https://github.com/webguard/webguard/blob/main/docs/rules";

pub(crate) fn docs_url(id: &str) -> String {
    format!("{DOCS_BASE}/{id}.md")
}

// sql-injection
pub const DB_FACADES: &[&str] = &["DB"];
pub const RAW_DB_METHODS: &[&str] = &[
    "raw",
    "select",
    "selectOne",
    "scalar",
    "statement",
    "unprepared",
    "insert",
    "update",
    "delete",
    "affectingStatement",
];
pub const RAW_BUILDER_METHODS: &[&str] = &[
    "whereRaw",
    "orWhereRaw",
    "orderByRaw",
    "selectRaw",
    "havingRaw",
    "orHavingRaw",
    "groupByRaw",
    "fromRaw",
];
pub const RAW_SQL_FUNCTIONS: &[&str] = &[
    "mysqli_query",
    "mysqli_real_query",
    "mysqli_multi_query",
    "mysql_query",
    "pg_query",
    "sqlite_query",
];
pub const PDO_METHODS: &[&str] = &["query", "exec"];
pub const PDO_VARIABLES: &[&str] = &["pdo", "db", "dbh", "conn", "connection"];
pub const QUERY_VARIABLES: &[&str] = &["query", "builder", "q"];

// mass-assignment
pub const MASS_ASSIGNMENT_STATIC: &[&str] = &[
    "create",
    "forceCreate",
    "update",
    "fill",
    "forceFill",
    "insert",
    "firstOrCreate",
    "firstOrNew",
    "updateOrCreate",
    "make",
];
pub const MASS_ASSIGNMENT_INSTANCE: &[&str] = &["fill", "update", "forceFill"];
/// Facades whose static `create`/`update` calls are not Eloquent models.
pub const NON_MODEL_CLASSES: &[&str] = &[
    "DB", "Request", "Input", "Cache", "Session", "Config", "Validator", "Storage", "Log", "Hash",
    "Auth", "Route", "Mail", "Queue", "Event", "Response", "View", "Redirect", "Carbon", "Str",
    "Arr", "Http", "File", "Cookie", "Crypt", "URL", "Gate", "Schema", "Artisan", "Bus",
    "Notification", "Password", "RateLimiter", "Broadcast", "Lang", "App", "Collection",
];
/// Class name suffixes that are clearly not models.
pub const NON_MODEL_SUFFIXES: &[&str] = &[
    "Controller",
    "Middleware",
    "Request",
    "Provider",
    "Service",
    "Repository",
    "Job",
    "Event",
    "Listener",
    "Mail",
    "Notification",
    "Policy",
    "Command",
    "Exception",
    "Factory",
    "Seeder",
    "Test",
    "Resource",
    "Kernel",
    "Observer",
    "Rule",
    "Handler",
    "Helper",
    "Scope",
    "Cast",
    "Enum",
];
pub const MODEL_BASES: &[&str] = &["Model", "Authenticatable", "Pivot", "MorphPivot", "User"];

// password-hashing
pub const SAFE_PASSWORD_ALGORITHMS: &[&str] = &[
    "PASSWORD_DEFAULT",
    "PASSWORD_BCRYPT",
    "PASSWORD_ARGON2I",
    "PASSWORD_ARGON2ID",
    "2y",
    "argon2i",
    "argon2id",
];
pub const WEAK_HASH_FUNCTIONS: &[&str] = &["md5", "sha1", "crypt"];
pub const WEAK_HASH_ALGORITHMS: &[&str] = &["md5", "sha1", "md4", "crc32"];
pub const DEFAULT_MIN_BCRYPT_COST: u64 = 10;

// debug-mode
pub const DEBUG_FUNCTIONS: &[&str] = &[
    "dd",
    "dump",
    "var_dump",
    "print_r",
    "var_export",
    "phpinfo",
    "ray",
    "debug_zval_dump",
];
pub const DEBUG_PACKAGES: &[&str] = &[
    "barryvdh/laravel-debugbar",
    "laravel/telescope",
    "spatie/laravel-ray",
    "beyondcode/laravel-dump-server",
    "itsgoingd/clockwork",
    "spatie/laravel-ignition",
    "facade/ignition",
];
pub const PRODUCTION_ENVIRONMENTS: &[&str] = &["production", "prod", "live"];

// app-key
pub const APP_KEY_PLACEHOLDERS: &[&str] = &[
    "SomeRandomString",
    "SomeRandomKey",
    "base64:",
    "changeme",
    "change_me",
    "secret",
    "null",
    "your-app-key",
];

// csrf-protection
pub const CSRF_MARKERS: &[&str] = &["@csrf", "csrf_field(", "csrf_token(", "name=\"_token\""];
pub const DEFAULT_FORM_SCAN_LINES: u64 = 200;

// auth-middleware
pub const ROUTE_FACADES: &[&str] = &["Route"];
pub const STATE_CHANGING_VERBS: &[&str] = &[
    "post",
    "put",
    "patch",
    "delete",
    "any",
    "match",
    "resource",
    "apiResource",
    "resources",
    "apiResources",
];
pub const READ_ONLY_VERBS: &[&str] = &["get", "options", "view", "redirect", "permanentRedirect"];
pub const AUTH_MIDDLEWARE: &[&str] = &[
    "auth",
    "auth:*",
    "auth.*",
    "can:*",
    "role:*",
    "permission:*",
    "verified",
    "password.confirm",
];
pub const GUEST_MIDDLEWARE: &[&str] = &["guest", "guest:*", "signed"];
pub const SENSITIVE_URI_KEYWORDS: &[&str] = &[
    "admin", "dashboard", "manage", "settings", "users", "account", "billing", "roles",
];
pub const PUBLIC_URI_SEGMENTS: &[&str] = &[
    "login",
    "logout",
    "register",
    "password",
    "forgot-password",
    "reset-password",
    "two-factor-challenge",
    "webhook",
    "webhooks",
    "callback",
    "contact",
    "newsletter",
];

// security-headers
/// Header name and severity when no middleware or config sets it.
pub const SECURITY_HEADERS: &[(&str, loader::Severity)] = &[
    ("X-Frame-Options", loader::Severity::Low),
    ("X-Content-Type-Options", loader::Severity::Low),
    ("Strict-Transport-Security", loader::Severity::Medium),
    ("Content-Security-Policy", loader::Severity::Medium),
    ("Referrer-Policy", loader::Severity::Low),
];
/// Packages that emit every security header.
pub const HEADER_PACKAGES: &[&str] = &["bepsvpt/secure-headers", "treblle/security-headers"];
/// Packages that emit only a Content-Security-Policy.
pub const CSP_PACKAGES: &[&str] = &["spatie/laravel-csp"];

// dependency-hygiene
pub const COPYLEFT_PREFIXES: &[&str] = &["GPL", "AGPL", "LGPL", "SSPL", "EUPL", "OSL"];

// unescaped-output
pub const TAINT_HINTS: &[&str] = &[
    "request(",
    "Request::",
    "$request",
    "$_GET",
    "$_POST",
    "$_REQUEST",
    "$_COOKIE",
    "->input(",
    "old(",
];
pub const SAFE_RAW_OUTPUT: &[&str] = &["csrf_field()", "method_field(", "$slot", "@json("];

/// Every built-in rule configured from `config`, enabled or not, in
/// catalog order.
pub fn all_rules(config: &ScanConfig) -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(SqlInjection::new(&config.options(SqlInjection::ID))),
        Arc::new(MassAssignment::new(&config.options(MassAssignment::ID))),
        Arc::new(PasswordHashing::new(&config.options(PasswordHashing::ID))),
        Arc::new(DebugMode::new(&config.options(DebugMode::ID))),
        Arc::new(AppKey::new(&config.options(AppKey::ID))),
        Arc::new(CsrfProtection::new(&config.options(CsrfProtection::ID))),
        Arc::new(AuthMiddleware::new(&config.options(AuthMiddleware::ID))),
        Arc::new(SecurityHeaders::new(&config.options(SecurityHeaders::ID))),
        Arc::new(SessionSecurity::new(&config.options(SessionSecurity::ID))),
        Arc::new(DependencyHygiene::new(&config.options(DependencyHygiene::ID))),
        Arc::new(UnescapedOutput::new(&config.options(UnescapedOutput::ID))),
    ]
}

/// Rules enabled by `config`, in catalog order.
pub fn default_rules(config: &ScanConfig) -> Vec<Arc<dyn Rule>> {
    let rules: Vec<_> = all_rules(config)
        .into_iter()
        .filter(|r| config.is_rule_enabled(&r.metadata().id))
        .collect();
    debug!(rules = rules.len(), "Rule catalog built");
    rules
}

/// Identifiers of every built-in rule.
pub fn rule_ids() -> Vec<String> {
    all_rules(&ScanConfig::default())
        .iter()
        .map(|r| r.metadata().id.clone())
        .collect()
}
