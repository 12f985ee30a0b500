use anyhow::{Context, Result};
use console::{Term, style};
use delos_dl::config::ConfigManager;
use delos_dl::download::progress::format_bytes;
use delos_dl::input;
use delos_dl::{BatchObserver, BatchSummary, DownloadManager, DownloadResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// Prints one line per finished download above the progress bar.
struct TerminalObserver {
    bar: ProgressBar,
    verbose: bool,
}

impl BatchObserver for TerminalObserver {
    fn on_task_complete(&self, completed: usize, result: &DownloadResult) {
        self.bar.set_position(completed as u64);

        let line = if result.success {
            let size = if self.verbose {
                format!(" ({})", format_bytes(result.bytes_downloaded))
            } else {
                String::new()
            };
            format!("{} {}{}", style("->").green(), style(&result.message).green(), size)
        } else {
            format!("{} {}", style("->").red(), style(&result.message).red())
        };
        self.bar.println(line);
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.bar.finish();
    }
}

pub async fn handle_download(
    config_manager: &ConfigManager,
    urls: Vec<String>,
    file: Option<String>,
    output: Option<String>,
    max_concurrent: Option<u8>,
    verbose: bool,
) -> Result<()> {
    let term = Term::stdout();
    term.write_line(&format!(
        "{} Delos MP4 Downloader",
        style("🎓").cyan()
    ))?;

    let mut urls = input::collect_urls(urls, file.as_deref().map(Path::new))?;

    if urls.is_empty() {
        term.write_line("")?;
        term.write_line("No URLs provided via arguments. Please paste URLs below (one per line).")?;
        term.write_line(
            "Press Ctrl+D (Linux/macOS) or Ctrl+Z then Enter (Windows) when done.",
        )?;
        urls = input::read_url_paste(std::io::stdin().lock())?;
    }

    if urls.is_empty() {
        term.write_line(&format!(
            "{} No URLs provided. Exiting.",
            style("ℹ️").yellow()
        ))?;
        return Ok(());
    }

    let config = config_manager.config();
    let base_dir = PathBuf::from(output.unwrap_or_else(|| config.general.output_dir.clone()));
    std::fs::create_dir_all(&base_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", base_dir))?;

    let mut downloader_config = config.downloader_config();
    if let Some(n) = max_concurrent {
        downloader_config = downloader_config.with_max_concurrent(n as usize);
    }

    term.write_line("")?;
    term.write_line(&format!(
        "{} Found {} URL(s). Videos will be saved in subdirectories inside: {}",
        style("📁").cyan(),
        style(urls.len()).bold(),
        style(base_dir.display()).cyan()
    ))?;

    let manager = DownloadManager::new(downloader_config)?;

    let bar = ProgressBar::new(urls.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("Downloading [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} videos ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let observer = TerminalObserver {
        bar: bar.clone(),
        verbose,
    };
    let summary = manager.run_batch(urls, &base_dir, &observer).await;

    term.write_line("")?;
    term.write_line(&format!(
        "{} All downloads have been processed. {} succeeded, {} failed.",
        style("✅").green(),
        style(summary.succeeded).green(),
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed).dim()
        }
    ))?;
    if verbose {
        term.write_line(&format!(
            "   {}: {}",
            style("Total downloaded").dim(),
            format_bytes(summary.total_bytes())
        ))?;
    }

    Ok(())
}
