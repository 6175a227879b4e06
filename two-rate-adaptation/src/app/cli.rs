//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Two-Rate Adaptation - visuomotor rotation task core
#[derive(Parser, Debug)]
#[command(name = "two-rate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the schedule generated for a condition code
    Schedule {
        /// Condition code (defaults to the configured one)
        #[arg(long, allow_hyphen_values = true)]
        condition: Option<String>,

        /// Seed for the target shuffles
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the full schedule as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a complete session with scripted input
    Simulate {
        /// Condition code (defaults to the configured one)
        #[arg(long, allow_hyphen_values = true)]
        condition: Option<String>,

        /// Seed for the target shuffles and reach jitter
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output file (JSON lines); defaults to the configured data directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum initial reach-direction error in degrees
        #[arg(long, default_value = "0")]
        jitter: f64,

        /// Press the quit key after this many trials
        #[arg(long)]
        quit_after: Option<usize>,
    },

    /// List the counterbalancing cells
    Conditions,

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the configuration to the default location and create the
    /// data directory
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "experiment.condition", "feedback.ring_opacity")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_schedule_defaults() {
        let cli = Cli::try_parse_from(["two-rate", "schedule"]).unwrap();

        match cli.command {
            Commands::Schedule {
                condition,
                seed,
                json,
            } => {
                assert!(condition.is_none());
                assert!(seed.is_none());
                assert!(!json);
            }
            _ => panic!("Expected Schedule command"),
        }
    }

    #[test]
    fn test_cli_parse_schedule_with_all_options() {
        let args = vec![
            "two-rate",
            "schedule",
            "--condition", "13",
            "--seed", "42",
            "--json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Schedule {
                condition,
                seed,
                json,
            } => {
                assert_eq!(condition.as_deref(), Some("13"));
                assert_eq!(seed, Some(42));
                assert!(json);
            }
            _ => panic!("Expected Schedule command"),
        }
    }

    #[test]
    fn test_cli_condition_is_kept_as_text() {
        let cli = Cli::try_parse_from(["two-rate", "schedule", "--condition", " 7abc"]).unwrap();
        match cli.command {
            Commands::Schedule { condition, .. } => {
                assert_eq!(condition.as_deref(), Some(" 7abc"));
            }
            _ => panic!("Expected Schedule command"),
        }
    }

    #[test]
    fn test_cli_parse_simulate() {
        let args = vec![
            "two-rate",
            "simulate",
            "--condition", "5",
            "--output", "/tmp/run.jsonl",
            "--jitter", "4.5",
            "--quit-after", "10",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Simulate {
                condition,
                seed,
                output,
                jitter,
                quit_after,
            } => {
                assert_eq!(condition.as_deref(), Some("5"));
                assert!(seed.is_none());
                assert_eq!(output, Some(PathBuf::from("/tmp/run.jsonl")));
                assert_eq!(jitter, 4.5);
                assert_eq!(quit_after, Some(10));
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["two-rate", "simulate"]).unwrap();
        match cli.command {
            Commands::Simulate {
                jitter, quit_after, ..
            } => {
                assert_eq!(jitter, 0.0);
                assert!(quit_after.is_none());
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parse_conditions() {
        let cli = Cli::try_parse_from(["two-rate", "conditions"]).unwrap();
        assert!(matches!(cli.command, Commands::Conditions));
    }

    #[test]
    fn test_cli_parse_config_actions() {
        let cli = Cli::try_parse_from(["two-rate", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));

        let cli = Cli::try_parse_from(["two-rate", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));

        let cli = Cli::try_parse_from(["two-rate", "config", "set", "experiment.condition", "9"])
            .unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Set { key, value },
            } => {
                assert_eq!(key, "experiment.condition");
                assert_eq!(value, "9");
            }
            _ => panic!("Expected Config Set command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "two-rate",
            "conditions",
            "--verbose",
            "--config",
            "/etc/two_rate.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/two_rate.toml")));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["two-rate", "record"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
