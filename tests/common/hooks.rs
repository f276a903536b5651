//! Hook script fixtures

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write an executable `/bin/sh` hook into `hooks_dir`
pub fn write_hook(hooks_dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(hooks_dir).expect("Failed to create hooks dir");
    let path = hooks_dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write hook");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod hook");
}
