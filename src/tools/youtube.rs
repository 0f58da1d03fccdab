//! YouTube video metadata and captions.

use crate::error::{AgentsError, Result};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, instrument};

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

const INVALID_URL: &str = "Error getting video ID from URL, please provide a valid YouTube url";

/// A caption line and the second it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCue {
    pub start_seconds: f64,
    pub text: String,
}

/// YouTube client. Metadata comes from oEmbed, captions from yt-dlp.
pub struct YouTube {
    http: reqwest::Client,
    captions_language: String,
}

impl YouTube {
    pub fn new(http: reqwest::Client, captions_language: &str) -> Self {
        Self {
            http,
            captions_language: captions_language.to_string(),
        }
    }

    /// Title, author and thumbnail of a video.
    #[instrument(skip(self))]
    pub async fn video_data(&self, url: &str) -> Result<String> {
        let video_id =
            extract_video_id(url).ok_or_else(|| AgentsError::InvalidInput(INVALID_URL.to_string()))?;

        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let json: Value = self
            .http
            .get(OEMBED_ENDPOINT)
            .query(&[("format", "json"), ("url", watch_url.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let keys = [
            "title",
            "author_name",
            "author_url",
            "type",
            "height",
            "width",
            "version",
            "provider_name",
            "provider_url",
            "thumbnail_url",
        ];
        let data: serde_json::Map<String, Value> = keys
            .iter()
            .filter_map(|k| json.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();

        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Captions as a single block of text.
    #[instrument(skip(self))]
    pub async fn video_captions(&self, url: &str) -> Result<String> {
        let cues = self.fetch_captions(url).await?;
        if cues.is_empty() {
            return Ok("No captions found for video".to_string());
        }
        Ok(cues
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Captions as `MM:SS - text` lines.
    #[instrument(skip(self))]
    pub async fn video_timestamps(&self, url: &str) -> Result<String> {
        let cues = self.fetch_captions(url).await?;
        if cues.is_empty() {
            return Ok("No captions found for video".to_string());
        }
        Ok(cues
            .iter()
            .map(|c| format!("{} - {}", format_timestamp(c.start_seconds), c.text))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn fetch_captions(&self, url: &str) -> Result<Vec<CaptionCue>> {
        let video_id =
            extract_video_id(url).ok_or_else(|| AgentsError::InvalidInput(INVALID_URL.to_string()))?;

        let dir = tempfile::tempdir()?;
        let output_template = dir.path().join("%(id)s");
        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--skip-download",
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                self.captions_language.as_str(),
                "--sub-format",
                "vtt",
                "--no-warnings",
                "-o",
            ])
            .arg(&output_template)
            .arg(&watch_url)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AgentsError::ToolNotFound("yt-dlp".to_string())
                } else {
                    AgentsError::ToolFailed(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentsError::ToolFailed(format!(
                "yt-dlp could not fetch captions for {}: {}",
                video_id,
                stderr.trim()
            )));
        }

        match find_vtt(dir.path())? {
            Some(path) => {
                let content = tokio::fs::read_to_string(&path).await?;
                let cues = parse_vtt(&content);
                debug!("Parsed {} caption cues for {}", cues.len(), video_id);
                Ok(cues)
            }
            None => Ok(Vec::new()),
        }
    }
}

fn find_vtt(dir: &Path) -> Result<Option<std::path::PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "vtt") {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:
                    youtube\.com/watch\?(?:[^\s\#]*&)?v=
                    | youtu\.be/
                    | youtube\.com/embed/
                    | youtube\.com/v/
                    | youtube\.com/shorts/
                    | youtube\.com/live/
                )
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract the video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

fn cue_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"))
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm`.
fn parse_vtt_time(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Parse WebVTT captions into cues.
///
/// Auto-generated captions repeat the previous line in every cue; repeated
/// lines are kept once.
pub fn parse_vtt(content: &str) -> Vec<CaptionCue> {
    let mut cues: Vec<CaptionCue> = Vec::new();
    let mut current_start: Option<f64> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.contains("-->") {
            current_start = line
                .split("-->")
                .next()
                .and_then(parse_vtt_time);
            continue;
        }

        if line.is_empty() {
            current_start = None;
            continue;
        }

        let Some(start) = current_start else {
            continue;
        };

        let text = super::decode_html_entities(cue_tag_regex().replace_all(line, "").trim());
        if text.is_empty() {
            continue;
        }

        if cues.last().is_some_and(|c| c.text == text) {
            continue;
        }

        cues.push(CaptionCue {
            start_seconds: start,
            text,
        });
    }

    cues
}

/// Format seconds as `MM:SS`; minutes keep counting past the hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
