//! The `tagcheck config` command.

use clap::{Args, Subcommand};
use std::path::Path;
use tagcheck_core::{Config, Taxonomy};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// List the taxonomy labels the classifier will use
    Labels,
}

pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            write_default_config(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Labels => {
            let config = Config::load()?;
            let taxonomy = Taxonomy::resolve(config.taxonomy_path().as_deref())?;
            for group in &taxonomy.groups {
                println!("{}", group.name);
                for category in &group.categories {
                    println!("  {} ({})", category.label, category.english);
                }
            }
            println!("\n{} labels", taxonomy.len());
        }
    }

    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path, false).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.columns.ground_truth, "tag_gt");
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let err = write_default_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        write_default_config(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[columns]"));
    }
}
