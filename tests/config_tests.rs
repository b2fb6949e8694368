//! Configuration loading from disk.

use std::fs;

use kpool::domain::RegistryMode;
use kpool::error::{ConfigError, Error};
use kpool::infrastructure::config::settings::Config;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn loads_a_full_config_file() {
    let (_dir, path) = write_config(
        r#"
[cluster]
name_prefix = "dev"
workers = 2
server_args = ["--disable=traefik"]

[network]
port_range_start = 7000
port_range_end = 7100

[registry]
mode = "pull-through-cache"
name = "cache.localhost"
port = 5050
volume = "kpool-cache"

[hooks]
env_prefix = "K3X"
timeout_secs = 10

[pool]
standby = 2
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.cluster.name_prefix, "dev");
    assert_eq!(config.cluster.workers, 2);
    assert_eq!(config.network.port_range_start, 7000);
    assert_eq!(config.hooks.env_prefix, "K3X");
    assert_eq!(config.pool.standby, 2);

    let registry = config.registry.requested().unwrap();
    assert_eq!(registry.mode, RegistryMode::PullThroughCache);
    assert_eq!(registry.address(), "cache.localhost:5050");
    assert_eq!(registry.volume.as_deref(), Some("kpool-cache"));

    let spec = config.cluster.spec(None, config.registry.requested());
    assert!(spec.name.starts_with("dev-"));
    assert_eq!(spec.server_args, vec!["--disable=traefik".to_string()]);
    assert_eq!(spec.registry, Some(registry));
}

#[test]
fn empty_file_gives_defaults() {
    let (_dir, path) = write_config("");
    let config = Config::load(&path).unwrap();
    assert_eq!(config.network.port_range_start, 6500);
    assert!(config.registry.requested().is_none());
    assert!(config.kubeconfig.merge);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn invalid_values_name_the_field() {
    let (_dir, path) = write_config("[network]\nport_range_start = 7000\nport_range_end = 6000\n");
    let err = Config::load(&path).unwrap_err();
    assert!(
        err.to_string()
            .starts_with("invalid value for network.port_range_end"),
        "{err}"
    );
}

#[test]
fn rendered_config_loads_back() {
    let (_dir, path) = write_config("[cluster]\nname_prefix = \"rt\"\n[pool]\nstandby = 3\n");
    let config = Config::load(&path).unwrap();

    let (_dir2, path2) = write_config(&config.to_toml().unwrap());
    let again = Config::load(&path2).unwrap();
    assert_eq!(again.cluster.name_prefix, "rt");
    assert_eq!(again.pool.standby, 3);
}
