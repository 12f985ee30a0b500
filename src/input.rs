//! Gathering source URLs from arguments, a text file or a stdin paste.

use anyhow::{Context, Result};
use std::fs;
use std::io::BufRead;
use std::path::Path;

/// One URL per line; surrounding whitespace is trimmed and blank lines dropped.
pub fn parse_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL file: {:?}", path))?;
    Ok(parse_url_lines(&content))
}

/// Argument URLs first, then the ones listed in `file`.
pub fn collect_urls(args: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    let mut urls: Vec<String> = args
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(path) = file {
        urls.extend(read_url_file(path)?);
    }

    Ok(urls)
}

/// Reads pasted URLs until end of input.
pub fn read_url_paste<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read URLs from standard input")?;
        let line = line.trim();
        if !line.is_empty() {
            urls.push(line.to_string());
        }
    }
    Ok(urls)
}
