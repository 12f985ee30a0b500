use anyhow::{Context, Result};
use regex::Regex;

/// What a presentation metadata document tells us about one lecture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationMetadata {
    pub title: Option<String>,
    pub video_url: Option<String>,
}

/// Turns a raw metadata response into [`PresentationMetadata`].
///
/// Missing fields are reported as `None`; an extractor never fails.
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &str) -> PresentationMetadata;
}

/// Best-effort pattern matching over the player's XML response.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    title: Regex,
    video: Regex,
}

impl RegexExtractor {
    pub fn new() -> Result<Self> {
        let title = Regex::new(r"<title>(.+?)</title>").context("Invalid title pattern")?;
        let video = Regex::new(r#">([^"'<]+\.mp4)<"#).context("Invalid video pattern")?;
        Ok(Self { title, video })
    }

    pub fn title(&self, raw: &str) -> Option<String> {
        self.title
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    pub fn video_url(&self, raw: &str) -> Option<String> {
        self.video
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl Extractor for RegexExtractor {
    fn extract(&self, raw: &str) -> PresentationMetadata {
        PresentationMetadata {
            title: self.title(raw),
            video_url: self.video_url(raw),
        }
    }
}
