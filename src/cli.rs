use std::path::{Path, PathBuf};

mod check;
mod docs;
mod list;
mod outline;
mod report;
mod terminal;

use check::Check;
use clap::ArgAction;
use docs::Docs;
use list::List;
use outline::Outline;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the checked project
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Check(Check::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Check dependency manifests (default)
    Check(Check),

    /// Check the documentation outline
    Docs(Docs),

    /// List requirements across the configured manifests
    List(List),

    /// Print the documentation outline as a tree
    Outline(Outline),

    /// Create a default configuration file
    Init,

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Check(command) => command.run(root)?,
            Self::Docs(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Outline(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &PathBuf) -> anyhow::Result<()> {
        let path = root.join(pincheck::Config::FILE_NAME);
        if path.exists() {
            anyhow::bail!(
                "Already initialised (found existing {})",
                pincheck::Config::FILE_NAME
            );
        }

        pincheck::Config::default()
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", pincheck::Config::FILE_NAME))?;

        println!("Initialised pincheck in {}", root.display());
        println!("  Created: {}", pincheck::Config::FILE_NAME);
        println!();
        println!("Next steps:");
        println!("  pincheck check");
        println!("  pincheck docs");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(pincheck::Config::FILE_NAME);

        match self.command {
            ConfigCommand::Show => {
                let config =
                    pincheck::Config::load_or_default(root).map_err(|e| anyhow::anyhow!("{e}"))?;

                println!("Configuration:");
                println!("  manifests: {:?}", config.manifests());
                println!("  docs_root: {}", config.docs_root().display());
                println!("  root_doc: {}", config.root_doc());
                println!("  source_suffix: {}", config.source_suffix());
                println!("  allow_unpinned: {}", config.allow_unpinned);
            }
            ConfigCommand::Set { key, value } => {
                let mut config =
                    pincheck::Config::load_or_default(root).map_err(|e| anyhow::anyhow!("{e}"))?;

                match key.as_str() {
                    "allow_unpinned" => {
                        let bool_value = value
                            .parse::<bool>()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                        config.allow_unpinned = bool_value;
                    }
                    "docs_root" => config.set_docs_root(PathBuf::from(&value)),
                    "root_doc" => config.set_root_doc(value),
                    _ => {
                        return Err(anyhow::anyhow!(
                            "Unknown configuration key: '{key}'\nSupported keys: allow_unpinned, \
                             docs_root, root_doc",
                        ));
                    }
                }

                config
                    .save(&config_path)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("Set {key}");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn init_creates_a_config_file() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Init::run(&root).expect("init should succeed in an empty directory");
        assert!(root.join(pincheck::Config::FILE_NAME).exists());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Init::run(&root).unwrap();
        assert!(Init::run(&root).is_err());
    }

    #[test]
    fn config_set_round_trips_through_the_file() {
        let tmp = tempdir().unwrap();

        let command = Config {
            command: ConfigCommand::Set {
                key: "allow_unpinned".to_string(),
                value: "true".to_string(),
            },
        };
        command.run(tmp.path()).expect("config set should succeed");

        let config = pincheck::Config::load_or_default(tmp.path()).unwrap();
        assert!(config.allow_unpinned);
    }

    #[test]
    fn config_set_rejects_unknown_keys() {
        let tmp = tempdir().unwrap();

        let command = Config {
            command: ConfigCommand::Set {
                key: "colour".to_string(),
                value: "blue".to_string(),
            },
        };
        assert!(command.run(tmp.path()).is_err());
    }
}
