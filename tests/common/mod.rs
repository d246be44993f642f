//! Shared helpers for the HTTP API tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use axum_test::TestServer;
use sharebox::config::{Config, PermissionsConfig};
use sharebox::WebServer;
use tempfile::TempDir;

/// Every operation enabled.
pub fn all_permissions() -> PermissionsConfig {
    PermissionsConfig {
        upload: true,
        download: true,
        delete: true,
        rename: true,
        move_entries: true,
        create_folder: true,
        preview: true,
    }
}

/// Configuration sharing `share` with the given permissions.
pub fn test_config(share: &TempDir, permissions: PermissionsConfig) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.share.path = share.path().to_string_lossy().into_owned();
    config.share.excluded_files = vec![".DS_Store".to_string()];
    config.permissions = permissions;
    config
}

/// Build a test server for `config`.
pub fn create_test_server(config: &Config) -> TestServer {
    let server = WebServer::new(config).expect("Failed to create web server");
    TestServer::new(server.router()).expect("Failed to create test server")
}

/// Populate a share with a small tree:
///
/// ```text
/// docs/
///   readme.txt
///   report.pdf
///   inner/
///     notes.md
/// photo.png
/// .DS_Store
/// ```
pub fn populate(root: &Path) {
    fs::create_dir_all(root.join("docs/inner")).unwrap();
    fs::write(root.join("docs/readme.txt"), "hello sharebox").unwrap();
    fs::write(root.join("docs/report.pdf"), b"%PDF-1.4 fake").unwrap();
    fs::write(root.join("docs/inner/notes.md"), "# notes").unwrap();
    fs::write(root.join("photo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    fs::write(root.join(".DS_Store"), "junk").unwrap();
}

/// Share with the populated tree and all permissions.
pub fn create_populated_server() -> (TestServer, TempDir) {
    let share = TempDir::new().unwrap();
    populate(share.path());
    let server = create_test_server(&test_config(&share, all_permissions()));
    (server, share)
}
