//! Tool plugins agents can call through model function calling.
//!
//! A [`Toolkit`] is what an agent configuration names; each toolkit expands
//! into one or more functions exposed to the model.

mod duckduckgo;
mod yfinance;
mod youtube;

pub use duckduckgo::{parse_html_results, parse_news_results, DuckDuckGo, NewsResult, SearchResult};
pub use yfinance::{
    parse_analyst_recommendations, parse_chart_price, parse_company_info, parse_company_news,
    YFinance,
};
pub use youtube::{extract_video_id, format_timestamp, parse_vtt, CaptionCue, YouTube};

use crate::config::ToolSettings;
use crate::error::{AgentsError, Result};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

fn enabled() -> bool {
    true
}

/// A capability plugin named in an agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Toolkit {
    /// Web and news search.
    DuckDuckGo {
        #[serde(default = "enabled")]
        search: bool,
        #[serde(default = "enabled")]
        news: bool,
    },
    /// Market data from Yahoo Finance.
    YFinance {
        #[serde(default = "enabled")]
        stock_price: bool,
        #[serde(default)]
        analyst_recommendations: bool,
        #[serde(default)]
        company_info: bool,
        #[serde(default)]
        company_news: bool,
    },
    /// Video metadata and captions.
    YouTube,
}

impl Toolkit {
    /// DuckDuckGo with search and news enabled.
    pub fn duckduckgo() -> Self {
        Toolkit::DuckDuckGo {
            search: true,
            news: true,
        }
    }

    /// Short name used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            Toolkit::DuckDuckGo { .. } => "duckduckgo",
            Toolkit::YFinance { .. } => "yfinance",
            Toolkit::YouTube => "youtube",
        }
    }

    /// Function names this toolkit exposes.
    pub fn function_names(&self) -> Vec<&'static str> {
        match self {
            Toolkit::DuckDuckGo { search, news } => [
                (*search, "duckduckgo_search"),
                (*news, "duckduckgo_news"),
            ]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect(),
            Toolkit::YFinance {
                stock_price,
                analyst_recommendations,
                company_info,
                company_news,
            } => [
                (*stock_price, "get_current_stock_price"),
                (*analyst_recommendations, "get_analyst_recommendations"),
                (*company_info, "get_company_info"),
                (*company_news, "get_company_news"),
            ]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect(),
            Toolkit::YouTube => vec![
                "get_youtube_video_captions",
                "get_youtube_video_data",
                "get_video_timestamps",
            ],
        }
    }
}

/// A parsed function call from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    DuckDuckGoSearch { query: String, max_results: usize },
    DuckDuckGoNews { query: String, max_results: usize },
    GetCurrentStockPrice { symbol: String },
    GetAnalystRecommendations { symbol: String },
    GetCompanyInfo { symbol: String },
    GetCompanyNews { symbol: String, num_stories: usize },
    GetYoutubeVideoCaptions { url: String },
    GetYoutubeVideoData { url: String },
    GetVideoTimestamps { url: String },
}

impl ToolCall {
    /// Function name as exposed to the model.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::DuckDuckGoSearch { .. } => "duckduckgo_search",
            ToolCall::DuckDuckGoNews { .. } => "duckduckgo_news",
            ToolCall::GetCurrentStockPrice { .. } => "get_current_stock_price",
            ToolCall::GetAnalystRecommendations { .. } => "get_analyst_recommendations",
            ToolCall::GetCompanyInfo { .. } => "get_company_info",
            ToolCall::GetCompanyNews { .. } => "get_company_news",
            ToolCall::GetYoutubeVideoCaptions { .. } => "get_youtube_video_captions",
            ToolCall::GetYoutubeVideoData { .. } => "get_youtube_video_data",
            ToolCall::GetVideoTimestamps { .. } => "get_video_timestamps",
        }
    }
}

fn required_str(args: &Value, key: &str) -> Result<String> {
    args[key]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AgentsError::InvalidInput(format!("Missing '{}' argument", key)))
}

fn optional_count(args: &Value, key: &str, default: usize) -> usize {
    args[key].as_u64().map(|n| n as usize).unwrap_or(default)
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: Value = if arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| AgentsError::InvalidInput(format!("Invalid tool arguments: {}", e)))?
    };

    match name {
        "duckduckgo_search" => Ok(ToolCall::DuckDuckGoSearch {
            query: required_str(&args, "query")?,
            max_results: optional_count(&args, "max_results", 5),
        }),
        "duckduckgo_news" => Ok(ToolCall::DuckDuckGoNews {
            query: required_str(&args, "query")?,
            max_results: optional_count(&args, "max_results", 5),
        }),
        "get_current_stock_price" => Ok(ToolCall::GetCurrentStockPrice {
            symbol: required_str(&args, "symbol")?,
        }),
        "get_analyst_recommendations" => Ok(ToolCall::GetAnalystRecommendations {
            symbol: required_str(&args, "symbol")?,
        }),
        "get_company_info" => Ok(ToolCall::GetCompanyInfo {
            symbol: required_str(&args, "symbol")?,
        }),
        "get_company_news" => Ok(ToolCall::GetCompanyNews {
            symbol: required_str(&args, "symbol")?,
            num_stories: optional_count(&args, "num_stories", 3),
        }),
        "get_youtube_video_captions" => Ok(ToolCall::GetYoutubeVideoCaptions {
            url: required_str(&args, "url")?,
        }),
        "get_youtube_video_data" => Ok(ToolCall::GetYoutubeVideoData {
            url: required_str(&args, "url")?,
        }),
        "get_video_timestamps" => Ok(ToolCall::GetVideoTimestamps {
            url: required_str(&args, "url")?,
        }),
        _ => Err(AgentsError::InvalidInput(format!("Unknown tool: {}", name))),
    }
}

fn function(name: &str, description: &str, parameters: Value) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
            strict: None,
        },
    }
}

fn definition(name: &str) -> Option<ChatCompletionTool> {
    let symbol_only = serde_json::json!({
        "type": "object",
        "properties": {
            "symbol": { "type": "string", "description": "The stock symbol, e.g. NVDA" }
        },
        "required": ["symbol"]
    });
    let url_only = serde_json::json!({
        "type": "object",
        "properties": {
            "url": { "type": "string", "description": "URL of the YouTube video" }
        },
        "required": ["url"]
    });

    let tool = match name {
        "duckduckgo_search" => function(
            name,
            "Search DuckDuckGo for a query. Returns a JSON list of results with title, href and body.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The query to search for" },
                    "max_results": { "type": "integer", "description": "Maximum number of results (default: 5)", "default": 5 }
                },
                "required": ["query"]
            }),
        ),
        "duckduckgo_news" => function(
            name,
            "Get the latest news from DuckDuckGo. Returns a JSON list of articles.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The query to search for" },
                    "max_results": { "type": "integer", "description": "Maximum number of results (default: 5)", "default": 5 }
                },
                "required": ["query"]
            }),
        ),
        "get_current_stock_price" => function(
            name,
            "Get the current stock price for a given symbol.",
            symbol_only,
        ),
        "get_analyst_recommendations" => function(
            name,
            "Get analyst recommendations (strong buy to strong sell counts) for a given stock symbol.",
            symbol_only,
        ),
        "get_company_info" => function(
            name,
            "Get company information and an overview for a given stock symbol.",
            symbol_only,
        ),
        "get_company_news" => function(
            name,
            "Get recent news articles about a company.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "symbol": { "type": "string", "description": "The stock symbol, e.g. NVDA" },
                    "num_stories": { "type": "integer", "description": "Number of stories to return (default: 3)", "default": 3 }
                },
                "required": ["symbol"]
            }),
        ),
        "get_youtube_video_captions" => function(
            name,
            "Get the captions (spoken text) of a YouTube video.",
            url_only,
        ),
        "get_youtube_video_data" => function(
            name,
            "Get metadata of a YouTube video: title, author, thumbnail and provider.",
            url_only,
        ),
        "get_video_timestamps" => function(
            name,
            "Get timestamped caption lines of a YouTube video in 'MM:SS - text' form.",
            url_only,
        ),
        _ => return None,
    };

    Some(tool)
}

/// Function definitions for every function the toolkits enable.
pub fn tool_definitions(toolkits: &[Toolkit]) -> Vec<ChatCompletionTool> {
    toolkits
        .iter()
        .flat_map(|t| t.function_names())
        .filter_map(definition)
        .collect()
}

/// Tool execution context for one agent.
pub struct ToolContext {
    toolkits: Vec<Toolkit>,
    duckduckgo: DuckDuckGo,
    yfinance: YFinance,
    youtube: YouTube,
}

impl ToolContext {
    /// Create a context whose HTTP clients share the configured timeout and user agent.
    pub fn new(toolkits: Vec<Toolkit>, settings: &ToolSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;

        // Yahoo's quote endpoints require the consent cookie to travel with the crumb
        let cookie_http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.clone())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            toolkits,
            duckduckgo: DuckDuckGo::new(http.clone()),
            yfinance: YFinance::new(cookie_http),
            youtube: YouTube::new(http, &settings.captions_language),
        })
    }

    /// Function definitions to send with each model request.
    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        tool_definitions(&self.toolkits)
    }

    /// Whether the agent's toolkits enable the named function.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.toolkits
            .iter()
            .any(|t| t.function_names().contains(&name))
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        if !self.is_enabled(tool.name()) {
            return Err(AgentsError::InvalidInput(format!(
                "Tool '{}' is not available to this agent",
                tool.name()
            )));
        }

        debug!("Executing tool {}", tool.name());

        match tool {
            ToolCall::DuckDuckGoSearch { query, max_results } => {
                self.duckduckgo.search(query, *max_results).await
            }
            ToolCall::DuckDuckGoNews { query, max_results } => {
                self.duckduckgo.news(query, *max_results).await
            }
            ToolCall::GetCurrentStockPrice { symbol } => {
                self.yfinance.current_stock_price(symbol).await
            }
            ToolCall::GetAnalystRecommendations { symbol } => {
                self.yfinance.analyst_recommendations(symbol).await
            }
            ToolCall::GetCompanyInfo { symbol } => self.yfinance.company_info(symbol).await,
            ToolCall::GetCompanyNews {
                symbol,
                num_stories,
            } => self.yfinance.company_news(symbol, *num_stories).await,
            ToolCall::GetYoutubeVideoCaptions { url } => self.youtube.video_captions(url).await,
            ToolCall::GetYoutubeVideoData { url } => self.youtube.video_data(url).await,
            ToolCall::GetVideoTimestamps { url } => self.youtube.video_timestamps(url).await,
        }
    }
}

/// Decode the HTML entities that appear in search result markup.
pub(crate) fn decode_html_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_tool() {
        let tool =
            parse_tool_call("duckduckgo_search", r#"{"query": "rust async", "max_results": 3}"#)
                .unwrap();
        assert_eq!(
            tool,
            ToolCall::DuckDuckGoSearch {
                query: "rust async".to_string(),
                max_results: 3
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        let tool = parse_tool_call("get_company_news", r#"{"symbol": "TSLA"}"#).unwrap();
        assert_eq!(
            tool,
            ToolCall::GetCompanyNews {
                symbol: "TSLA".to_string(),
                num_stories: 3
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_tool_call("get_company_info", "{}").is_err());
        assert!(parse_tool_call("get_company_info", "not json").is_err());
        assert!(parse_tool_call("launch_rocket", "{}").is_err());
    }

    #[test]
    fn test_yfinance_flags_gate_functions() {
        let toolkit = Toolkit::YFinance {
            stock_price: true,
            analyst_recommendations: false,
            company_info: true,
            company_news: false,
        };
        assert_eq!(
            toolkit.function_names(),
            vec!["get_current_stock_price", "get_company_info"]
        );

        let definitions = tool_definitions(&[toolkit]);
        let names: Vec<_> = definitions.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["get_current_stock_price", "get_company_info"]);
    }

    #[test]
    fn test_every_function_has_definition() {
        let toolkits = vec![
            Toolkit::duckduckgo(),
            Toolkit::YFinance {
                stock_price: true,
                analyst_recommendations: true,
                company_info: true,
                company_news: true,
            },
            Toolkit::YouTube,
        ];
        assert_eq!(tool_definitions(&toolkits).len(), 9);
    }

    #[test]
    fn test_toolkit_serde() {
        let toolkit: Toolkit = serde_json::from_str(r#"{"kind": "yfinance"}"#).unwrap();
        assert_eq!(toolkit.function_names(), vec!["get_current_stock_price"]);

        let youtube: Toolkit = serde_json::from_str(r#"{"kind": "youtube"}"#).unwrap();
        assert_eq!(youtube, Toolkit::YouTube);
        assert_eq!(youtube.label(), "youtube");
    }

    #[tokio::test]
    async fn test_execute_rejects_disabled_tool() {
        let context = ToolContext::new(vec![Toolkit::YouTube], &ToolSettings::default()).unwrap();
        assert!(context.is_enabled("get_video_timestamps"));

        let call = ToolCall::DuckDuckGoSearch {
            query: "anything".to_string(),
            max_results: 1,
        };
        let err = context.execute(&call).await.unwrap_err();
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_html_entities("Tom &amp; Jerry&#x27;s &quot;show&quot;"),
            "Tom & Jerry's \"show\""
        );
    }
}
