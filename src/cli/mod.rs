use clap::{Parser, Subcommand};

pub mod config;
pub mod init;
pub mod run;
pub mod status;
pub mod verify;
pub mod version;

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the Gatekeeper moderation relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay (console mode: directives are read from stdin)
    Run {
        /// Path to config file (default: ~/.config/gatekeeper/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Path to config file (default: ~/.config/gatekeeper/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show stored per-guild settings
    Status {
        /// Path to config file (default: ~/.config/gatekeeper/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Check that the config parses and the settings store loads
    Verify {
        /// Path to config file (default: ~/.config/gatekeeper/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => run::execute(config).await,
        Commands::Init { config, force } => init::execute(config, force).await,
        Commands::Status { config } => status::execute(config).await,
        Commands::Verify { config } => verify::execute(config).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["gatekeeper", "run", "--config", "/etc/gatekeeper/config.toml"]);

        match cli.command {
            Commands::Run { config } => {
                assert_eq!(config, Some("/etc/gatekeeper/config.toml".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["gatekeeper", "run"]);

        match cli.command {
            Commands::Run { config } => assert_eq!(config, None),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["gatekeeper", "init", "--force"]);

        match cli.command {
            Commands::Init { config, force } => {
                assert_eq!(config, None);
                assert!(force);
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["gatekeeper", "status", "--config", "/tmp/c.toml"]);

        match cli.command {
            Commands::Status { config } => assert_eq!(config, Some("/tmp/c.toml".to_string())),
            _ => panic!("Expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::parse_from(["gatekeeper", "verify"]);
        assert!(matches!(cli.command, Commands::Verify { config: None }));
    }

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::parse_from(["gatekeeper", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["gatekeeper", "register"]).is_err());
    }
}
