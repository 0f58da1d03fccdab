//! DuckDuckGo web and news search.

use super::decode_html_entities;
use crate::error::{AgentsError, Result};
use chrono::DateTime;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, instrument};
use url::Url;

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const TOKEN_ENDPOINT: &str = "https://duckduckgo.com/";
const NEWS_ENDPOINT: &str = "https://duckduckgo.com/news.js";

/// A web search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// A news article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsResult {
    pub date: Option<String>,
    pub title: String,
    pub body: String,
    pub url: String,
    pub source: String,
}

/// DuckDuckGo client.
pub struct DuckDuckGo {
    http: reqwest::Client,
}

impl DuckDuckGo {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Web search through the HTML endpoint.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max_results: usize) -> Result<String> {
        let html = self
            .http
            .post(HTML_ENDPOINT)
            .form(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let results = parse_html_results(&html, max_results);
        debug!("DuckDuckGo returned {} results", results.len());
        Ok(serde_json::to_string_pretty(&results)?)
    }

    /// News search through the JSON endpoint, which requires a per-query token.
    #[instrument(skip(self))]
    pub async fn news(&self, query: &str, max_results: usize) -> Result<String> {
        let vqd = self.vqd_token(query).await?;

        let url = Url::parse_with_params(
            NEWS_ENDPOINT,
            &[
                ("l", "us-en"),
                ("o", "json"),
                ("noamp", "1"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("p", "-1"),
            ],
        )
        .map_err(|e| AgentsError::ToolFailed(format!("Invalid news URL: {}", e)))?;

        let json: Value = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let results = parse_news_results(&json, max_results);
        debug!("DuckDuckGo news returned {} results", results.len());
        Ok(serde_json::to_string_pretty(&results)?)
    }

    async fn vqd_token(&self, query: &str) -> Result<String> {
        let page = self
            .http
            .get(TOKEN_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        extract_vqd(&page).ok_or_else(|| {
            AgentsError::ToolFailed("DuckDuckGo did not return a search token".to_string())
        })
    }
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
            .expect("Invalid regex")
    })
}

fn snippet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).expect("Invalid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex"))
}

fn vqd_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"vqd=["']?([0-9-]+)["'&]"#).expect("Invalid regex"))
}

fn clean_text(html: &str) -> String {
    let text = tag_regex().replace_all(html, "");
    decode_html_entities(text.trim())
}

/// Unwrap DuckDuckGo's redirect links (`//duckduckgo.com/l/?uddg=...`).
fn resolve_href(raw: &str) -> Option<String> {
    let raw = decode_html_entities(raw);
    let absolute = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw
    };

    let url = Url::parse(&absolute).ok()?;

    // Sponsored results go through the ad click endpoint
    if url.path().starts_with("/y.js") {
        return None;
    }

    if url.domain().is_some_and(|d| d.ends_with("duckduckgo.com")) && url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }

    Some(absolute)
}

/// Parse results from the HTML search page.
pub fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let links: Vec<_> = link_regex().captures_iter(html).collect();
    let mut results = Vec::new();

    for (i, caps) in links.iter().enumerate() {
        if results.len() >= max_results {
            break;
        }

        let (Some(whole), Some(href), Some(title)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };

        let Some(href) = resolve_href(href.as_str()) else {
            continue;
        };

        // The snippet sits between this link and the next one
        let end = links
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let body = snippet_regex()
            .captures(&html[whole.end()..end])
            .and_then(|c| c.get(1))
            .map(|m| clean_text(m.as_str()))
            .unwrap_or_default();

        results.push(SearchResult {
            title: clean_text(title.as_str()),
            href,
            body,
        });
    }

    results
}

/// Parse the news endpoint's JSON payload.
pub fn parse_news_results(json: &Value, max_results: usize) -> Vec<NewsResult> {
    json["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let title = item["title"].as_str()?;
                    let url = item["url"].as_str()?;
                    Some(NewsResult {
                        date: item["date"]
                            .as_i64()
                            .and_then(|ts| DateTime::from_timestamp(ts, 0))
                            .map(|dt| dt.to_rfc3339()),
                        title: decode_html_entities(title),
                        body: clean_text(item["excerpt"].as_str().unwrap_or_default()),
                        url: url.to_string(),
                        source: item["source"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .take(max_results)
                .collect()
        })
        .unwrap_or_default()
}

fn extract_vqd(page: &str) -> Option<String> {
    vqd_regex()
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r##"
    <div class="result results_links results_links_deep web-result">
      <div class="links_main links_deep result__body">
        <h2 class="result__title">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming Language</a>
        </h2>
        <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F">A language empowering <b>everyone</b> to build reliable &amp; efficient software.</a>
      </div>
    </div>
    <div class="result results_links results_links_deep result--ad">
      <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Sponsored</a>
      <a class="result__snippet" href="#">Buy now</a>
    </div>
    <div class="result results_links results_links_deep web-result">
      <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Rust Book</a>
    </div>
    "##;

    #[test]
    fn test_parse_html_results() {
        let results = parse_html_results(SEARCH_PAGE, 10);
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].href, "https://www.rust-lang.org/");
        assert_eq!(
            results[0].body,
            "A language empowering everyone to build reliable & efficient software."
        );

        assert_eq!(results[1].href, "https://doc.rust-lang.org/book/");
        assert!(results[1].body.is_empty());
    }

    #[test]
    fn test_parse_html_results_limit() {
        assert_eq!(parse_html_results(SEARCH_PAGE, 1).len(), 1);
        assert!(parse_html_results("<html></html>", 5).is_empty());
    }

    #[test]
    fn test_parse_news_results() {
        let json = serde_json::json!({
            "results": [
                {
                    "date": 1700000000,
                    "title": "Chip stocks rally",
                    "excerpt": "Shares of <b>NVDA</b> rose.",
                    "url": "https://news.example.com/a",
                    "source": "Example News"
                },
                { "title": "missing url" },
                {
                    "title": "Second",
                    "url": "https://news.example.com/b"
                }
            ]
        });

        let results = parse_news_results(&json, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].body, "Shares of NVDA rose.");
        assert_eq!(results[0].date.as_deref(), Some("2023-11-14T22:13:20+00:00"));
        assert!(results[1].date.is_none());

        assert_eq!(parse_news_results(&json, 1).len(), 1);
        assert!(parse_news_results(&serde_json::json!({}), 5).is_empty());
    }

    #[test]
    fn test_extract_vqd() {
        let page = r#"<script>DDG.deep.initialize('/d.js?q=rust&vqd=4-123456789012345678901234567890&kl=wt-wt');</script>"#;
        assert_eq!(
            extract_vqd(page).as_deref(),
            Some("4-123456789012345678901234567890")
        );
        let quoted = r#"vqd="4-98765""#;
        assert_eq!(extract_vqd(quoted).as_deref(), Some("4-98765"));
        assert!(extract_vqd("nothing here").is_none());
    }
}
