#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const APP_KEY: &str = "base64:q2Vt2Kp3oC1zv7G4l6mJQdY0cX8rW5bN9hT1uE3sF0o=";

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Project whose only issue is `APP_DEBUG=true` in a local env (MEDIUM).
pub fn medium_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        ".env",
        &format!("APP_ENV=local\nAPP_KEY={APP_KEY}\nAPP_DEBUG=true\n"),
    );
    dir
}

/// Small Laravel project with a CRITICAL mass assignment and an
/// unprotected POST route.
pub fn vulnerable_project() -> TempDir {
    let dir = medium_project();
    write(
        dir.path(),
        "routes/web.php",
        "<?php\n\nuse Illuminate\\Support\\Facades\\Route;\n\nRoute::middleware('auth')->group(function () {\n    Route::post('/posts', [PostController::class, 'store']);\n});\n\nRoute::post('/comments', [CommentController::class, 'store']);\n",
    );
    write(
        dir.path(),
        "app/Http/Controllers/UserController.php",
        "<?php\n\nnamespace App\\Http\\Controllers;\n\nclass UserController extends Controller\n{\n    public function store()\n    {\n        return User::create(request()->all());\n    }\n}\n",
    );
    dir
}
