//! Command-line interface definitions.
//!
//! Defines the CLI structure for kpool using `clap`: the interactive `run`
//! session and configuration management.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::paths;

/// A pool of local k3d clusters with instant active-cluster recycling
#[derive(Parser, Debug)]
#[command(name = "kpool")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Resolve to a yes/no decision, given what auto-detection says.
    #[must_use]
    pub const fn enabled(self, detected: bool) -> bool {
        match self {
            Self::Auto => detected,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the cluster pool (foreground, interactive)
    Run(RunArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `kpool config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a commented default configuration file.
    Init(ConfigInitArgs),
    /// Display the effective configuration with defaults applied.
    Show(ConfigPathArg),
    /// Validate a configuration file.
    Validate(ConfigPathArg),
}

/// Shared argument for commands that only need a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,
}

/// Arguments for `kpool config init`.
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Where to write the file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `kpool run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file. Defaults apply when it does not exist.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// Standby clusters to keep ready (overrides `pool.standby`).
    #[arg(long)]
    pub standby: Option<usize>,

    /// Log level (overrides `logging.level`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_command_factory_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name_and_version() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "kpool");
        assert!(cmd.get_version().is_some());
    }

    #[test]
    fn test_color_choice_resolution() {
        assert!(ColorChoice::Auto.enabled(true));
        assert!(!ColorChoice::Auto.enabled(false));
        assert!(ColorChoice::Always.enabled(false));
        assert!(!ColorChoice::Never.enabled(true));
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["kpool", "--json", "-vv", "--color", "never", "run"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.color, ColorChoice::Never));
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::try_parse_from([
            "kpool",
            "run",
            "--config",
            "/tmp/kpool.toml",
            "--standby",
            "2",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("/tmp/kpool.toml"));
        assert_eq!(args.standby, Some(2));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(!args.json_logs);
    }

    #[test]
    fn test_run_defaults_to_home_config() {
        let cli = Cli::try_parse_from(["kpool", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, paths::default_config());
        assert!(args.standby.is_none());
    }

    #[test]
    fn test_parse_config_subcommands() {
        let cli = Cli::try_parse_from(["kpool", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommand::Init(ConfigInitArgs { force: true, .. }))
        ));

        let cli = Cli::try_parse_from(["kpool", "config", "validate", "-c", "x.toml"]).unwrap();
        let Commands::Config(ConfigCommand::Validate(arg)) = cli.command else {
            panic!("expected config validate");
        };
        assert_eq!(arg.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["kpool", "trade"]).is_err());
    }
}
