use anyhow::{Context, Result};
use regex::Regex;

/// Pulls the presentation id (`rid`) out of player/show page URLs such as
/// `https://delos.uoa.gr/opendelos/player?rid=2f8a1c9e`.
#[derive(Debug, Clone)]
pub struct ResourceIdParser {
    pattern: Regex,
}

impl ResourceIdParser {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"(player|show)\?rid=([a-zA-Z0-9]+)")
            .context("Invalid resource id pattern")?;
        Ok(Self { pattern })
    }

    /// Returns the captured id, or `None` if the URL has no `rid` parameter
    /// on a player or show page.
    pub fn parse<'a>(&self, url: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(url)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str())
    }
}
