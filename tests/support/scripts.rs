//! Hook scripts written to a temp dir.

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable shell script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
    path
}

/// A script appending its environment, one `KEY=VALUE` per line, to
/// `<dir>/<name>.env`. Returns the script and the dump file.
pub fn env_dump_script(dir: &Path, name: &str) -> (PathBuf, PathBuf) {
    let dump = dir.join(format!("{name}.env"));
    let script = write_script(dir, name, &format!("env >> '{}'", dump.display()));
    (script, dump)
}

/// Parse an env dump into `(key, value)` pairs.
pub fn read_env(dump: &Path) -> Vec<(String, String)> {
    fs::read_to_string(dump)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn env_value<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
    env.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
