//! Handler for the `config` command group.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;

/// Default config template with documentation.
pub(crate) const CONFIG_TEMPLATE: &str = include_str!("../../../../config.toml.example");

/// Load `path`, falling back to defaults when the file does not exist.
pub(crate) fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}

/// Execute `config init`.
pub fn execute_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            field: "config",
            reason: "file already exists (use --force to overwrite)".to_string(),
        }
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, CONFIG_TEMPLATE)?;
    output::section("Config Initialized");
    output::success("Created configuration file");
    output::field("Path", path.display());
    output::section("Next Steps");
    output::note(&format!("1. Edit {} with your settings", path.display()));
    output::note(&format!("2. Run: kpool config validate -c {}", path.display()));
    output::note(&format!("3. Run: kpool run -c {}", path.display()));
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let from_file = path.exists();
    let config = load_or_default(path)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.show",
            "path": path.display().to_string(),
            "from_file": from_file,
            "config": serde_json::to_value(&config)?,
        }));
        return Ok(());
    }

    output::section("Effective Configuration");
    output::field("Path", path.display());
    if !from_file {
        output::note("(file not found, showing defaults)");
    }
    output::section("Pool");
    output::field("Standby", config.pool.standby);
    output::field(
        "Ports",
        format!(
            "{}..{}",
            config.network.port_range_start, config.network.port_range_end
        ),
    );
    output::field(
        "Registry",
        match config.registry.requested() {
            Some(registry) => registry.to_string(),
            None => "disabled".to_string(),
        },
    );
    output::field(
        "Kubeconfig",
        if config.kubeconfig.merge {
            config.kubeconfig.resolved_path().display().to_string()
        } else {
            "not merged".to_string()
        },
    );
    output::section("TOML");
    output::raw(&config.to_toml()?);
    Ok(())
}

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    output::section("Config Validation");
    output::field("Path", path.display());
    let config = Config::load(path)?;
    output::success("Config file is valid");

    if config.hooks.create.is_none() && config.hooks.destroy.is_none() {
        output::hint("no hook scripts configured");
    }
    for script in [&config.hooks.create, &config.hooks.destroy]
        .into_iter()
        .flatten()
    {
        if !script.exists() {
            output::warning(&format!("hook script {} does not exist", script.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_a_valid_default_config() {
        let config = Config::parse_toml(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.cluster.name_prefix, "k3s-cluster");
        assert_eq!(config.network.port_range_start, 6500);
        assert_eq!(config.pool.standby, 1);
        assert!(!config.registry.mode.is_enabled());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        execute_init(&path, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        assert!(execute_init(&path, false).is_err());
        execute_init(&path, true).unwrap();
    }

    #[test]
    fn template_lists_only_hook_variables_that_are_set() {
        use crate::domain::{Cluster, ClusterSpec, HookAction, HookInvocation};

        let spec = ClusterSpec::new("c1").with_registry(crate::testkit::config::registry());
        let mut cluster = Cluster::provisioning(spec, 6500, true);
        cluster.master_ip = Some("172.18.0.2".into());
        cluster.kubeconfig_path = Some("/tmp/c1.yaml".into());
        let invocation = HookInvocation::new(HookAction::Create, cluster, true, "");

        let hooks = CONFIG_TEMPLATE
            .split("[hooks]")
            .nth(1)
            .and_then(|rest| rest.split("\n[").next())
            .unwrap();
        let named: Vec<&str> = hooks
            .lines()
            .filter(|line| line.starts_with('#'))
            .flat_map(|line| line.split(|c: char| !(c.is_ascii_uppercase() || c == '_')))
            .filter(|word| word.len() >= 6)
            .collect();

        assert!(named.contains(&"CLUSTER_NAME"));
        for name in named {
            assert!(invocation.var(name).is_some(), "{name} is not set for hooks");
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.pool.standby, 1);
    }
}
