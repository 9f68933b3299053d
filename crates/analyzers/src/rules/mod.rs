//! One module per built-in rule. Each rule keeps its tunables in the
//! struct and takes everything else from the [`engine::ScanContext`].

mod app_key;
mod auth_middleware;
mod csrf_protection;
mod debug_mode;
mod dependency_hygiene;
mod mass_assignment;
mod password_hashing;
mod security_headers;
mod session_security;
mod sql_injection;
mod unescaped_output;

pub use app_key::AppKey;
pub use auth_middleware::{AuthMiddleware, RouteStats};
pub use csrf_protection::CsrfProtection;
pub use debug_mode::DebugMode;
pub use dependency_hygiene::DependencyHygiene;
pub use mass_assignment::MassAssignment;
pub use password_hashing::PasswordHashing;
pub use security_headers::SecurityHeaders;
pub use session_security::SessionSecurity;
pub use sql_injection::SqlInjection;
pub use unescaped_output::UnescapedOutput;
