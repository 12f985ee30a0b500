use crate::cli::{ConfigAction, ConfigFormat};
use anyhow::{Context, Result};
use console::{Term, style};
use delos_dl::config::ConfigManager;
use dialoguer::Confirm;
use std::path::Path;
use std::process;

pub async fn handle_config(config_manager: &mut ConfigManager, action: ConfigAction) -> Result<()> {
    let term = Term::stdout();

    match action {
        ConfigAction::Show { format } => {
            let rendered = match format {
                ConfigFormat::Toml => toml::to_string_pretty(config_manager.config())
                    .context("Failed to serialize config")?,
                ConfigFormat::Json => serde_json::to_string_pretty(config_manager.config())
                    .context("Failed to serialize config")?,
            };

            term.write_line(&format!("{} Current configuration:", style("⚙️").cyan()))?;
            term.write_line("")?;
            term.write_line(&rendered)?;
        }

        ConfigAction::Path => {
            term.write_line(&config_manager.config_file().display().to_string())?;
        }

        ConfigAction::Validate => {
            term.write_line(&format!(
                "{} Validating configuration...",
                style("🔍").cyan()
            ))?;

            match config_manager.validate() {
                Ok(()) => {
                    term.write_line(&format!("{} Configuration is valid", style("✅").green()))?;
                }
                Err(e) => {
                    term.write_line(&format!(
                        "{} Configuration validation failed:",
                        style("❌").red()
                    ))?;
                    term.write_line(&format!("   {}", e))?;
                    term.write_line(&format!(
                        "{} Run 'delos-dl config reset' to restore defaults",
                        style("💡").yellow()
                    ))?;
                    process::exit(1);
                }
            }
        }

        ConfigAction::Sample { output, force } => {
            let target = output.as_deref().map(Path::new);
            let existing = target
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config_manager.config_dir().join("config.sample.toml"));

            if existing.exists() && !force {
                term.write_line(&format!(
                    "{} {} already exists, use --force to overwrite",
                    style("❌").red(),
                    existing.display()
                ))?;
                process::exit(1);
            }

            let sample = config_manager.create_sample_config(target)?;
            term.write_line(&format!(
                "{} Sample configuration written to {}",
                style("📝").green(),
                style(sample.display()).cyan()
            ))?;
        }

        ConfigAction::Reset { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Reset configuration to defaults?")
                    .default(false)
                    .interact()?;

            if !confirmed {
                term.write_line(&format!("{} Reset cancelled", style("ℹ️").yellow()))?;
                return Ok(());
            }

            config_manager.reset()?;
            term.write_line(&format!(
                "{} Configuration reset to defaults",
                style("✅").green()
            ))?;
        }
    }

    Ok(())
}
