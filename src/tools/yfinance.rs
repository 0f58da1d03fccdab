//! Yahoo Finance market data.

use crate::error::{AgentsError, Result};
use chrono::DateTime;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_ENDPOINT: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SEARCH_ENDPOINT: &str = "https://query1.finance.yahoo.com/v1/finance/search";
const COOKIE_ENDPOINT: &str = "https://fc.yahoo.com";
const CRUMB_ENDPOINT: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";

const COMPANY_MODULES: &str = "assetProfile,price,summaryDetail,financialData,defaultKeyStatistics";

/// Yahoo Finance client.
///
/// `quoteSummary` requests need a crumb tied to a session cookie; the crumb is
/// fetched lazily and refreshed once when Yahoo rejects it.
pub struct YFinance {
    http: reqwest::Client,
    crumb: Mutex<Option<String>>,
}

impl YFinance {
    /// `http` must have a cookie store enabled.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            crumb: Mutex::new(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn current_stock_price(&self, symbol: &str) -> Result<String> {
        let json: Value = self
            .http
            .get(symbol_url(CHART_ENDPOINT, symbol)?)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match parse_chart_price(&json) {
            Some(price) => Ok(format!("{:.4}", price)),
            None => Ok(format!("Could not fetch current price for {}", symbol)),
        }
    }

    #[instrument(skip(self))]
    pub async fn analyst_recommendations(&self, symbol: &str) -> Result<String> {
        let json = self.quote_summary(symbol, "recommendationTrend").await?;
        let trend = parse_analyst_recommendations(&json);
        if trend.is_empty() {
            return Ok(format!("No analyst recommendations found for {}", symbol));
        }
        Ok(serde_json::to_string_pretty(&trend)?)
    }

    #[instrument(skip(self))]
    pub async fn company_info(&self, symbol: &str) -> Result<String> {
        let json = self.quote_summary(symbol, COMPANY_MODULES).await?;
        let info = parse_company_info(symbol, &json).ok_or_else(|| {
            AgentsError::ToolFailed(format!("Could not fetch company info for {}", symbol))
        })?;
        Ok(serde_json::to_string_pretty(&info)?)
    }

    #[instrument(skip(self))]
    pub async fn company_news(&self, symbol: &str, num_stories: usize) -> Result<String> {
        let json: Value = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("q", symbol.to_uppercase()),
                ("quotesCount", "0".to_string()),
                ("newsCount", num_stories.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(serde_json::to_string_pretty(&parse_company_news(
            &json,
            num_stories,
        ))?)
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Result<Value> {
        let url = symbol_url(QUOTE_SUMMARY_ENDPOINT, symbol)?;

        for attempt in 0..2 {
            let crumb = self.crumb(attempt > 0).await?;
            let response = self
                .http
                .get(url.clone())
                .query(&[("modules", modules), ("crumb", crumb.as_str())])
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("Yahoo rejected crumb, refreshing");
                continue;
            }

            let json: Value = response.error_for_status()?.json().await?;
            if let Some(description) = json["quoteSummary"]["error"]["description"].as_str() {
                return Err(AgentsError::ToolFailed(description.to_string()));
            }
            return Ok(json);
        }

        Err(AgentsError::ToolFailed(
            "Yahoo Finance rejected the request".to_string(),
        ))
    }

    async fn crumb(&self, refresh: bool) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if !refresh {
            if let Some(crumb) = cached.as_ref() {
                return Ok(crumb.clone());
            }
        }

        // Only the Set-Cookie header matters; the page itself is a 404
        let _ = self.http.get(COOKIE_ENDPOINT).send().await;

        let crumb = self
            .http
            .get(CRUMB_ENDPOINT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if crumb.is_empty() || crumb.contains('<') {
            return Err(AgentsError::ToolFailed(
                "Could not obtain a Yahoo Finance crumb".to_string(),
            ));
        }

        debug!("Obtained Yahoo Finance crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
/// Endpoint URL with the symbol appended as one escaped path segment.
pub fn symbol_url(endpoint: &str, symbol: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| AgentsError::InvalidInput(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    url.path_segments_mut()
        .map_err(|_| AgentsError::InvalidInput(format!("Endpoint {} cannot take a path", endpoint)))?
        .push(&symbol.trim().to_uppercase());
    Ok(url)
}

fn raw(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => map.get("raw").cloned(),
        other => Some(other.clone()),
    }
}

/// Regular market price from the chart endpoint.
pub fn parse_chart_price(json: &Value) -> Option<f64> {
    json["chart"]["result"][0]["meta"]["regularMarketPrice"].as_f64()
}

/// Recommendation trend rows, most recent period first.
pub fn parse_analyst_recommendations(json: &Value) -> Vec<Value> {
    json["quoteSummary"]["result"][0]["recommendationTrend"]["trend"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    serde_json::json!({
                        "period": row["period"],
                        "strongBuy": row["strongBuy"],
                        "buy": row["buy"],
                        "hold": row["hold"],
                        "sell": row["sell"],
                        "strongSell": row["strongSell"],
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Company overview assembled from the quoteSummary modules.
pub fn parse_company_info(symbol: &str, json: &Value) -> Option<Map<String, Value>> {
    let result = json["quoteSummary"]["result"].get(0)?;
    let profile = &result["assetProfile"];
    let price = &result["price"];
    let summary = &result["summaryDetail"];
    let financial = &result["financialData"];
    let stats = &result["defaultKeyStatistics"];

    let current_price = raw(&financial["currentPrice"]).or_else(|| raw(&price["regularMarketPrice"]));
    let currency = price["currency"].as_str().unwrap_or("USD");

    let fields: Vec<(&str, Option<Value>)> = vec![
        ("Name", raw(&price["longName"]).or_else(|| raw(&price["shortName"]))),
        ("Symbol", Some(Value::String(symbol.to_uppercase()))),
        (
            "Current Stock Price",
            current_price.map(|p| Value::String(format!("{} {}", p, currency))),
        ),
        (
            "Market Cap",
            raw(&price["marketCap"]).map(|m| Value::String(format!("{} {}", m, currency))),
        ),
        ("Sector", raw(&profile["sector"])),
        ("Industry", raw(&profile["industry"])),
        ("Address", raw(&profile["address1"])),
        ("City", raw(&profile["city"])),
        ("State", raw(&profile["state"])),
        ("Zip", raw(&profile["zip"])),
        ("Country", raw(&profile["country"])),
        ("EPS", raw(&stats["trailingEps"])),
        ("P/E Ratio", raw(&summary["trailingPE"])),
        ("52 Week Low", raw(&summary["fiftyTwoWeekLow"])),
        ("52 Week High", raw(&summary["fiftyTwoWeekHigh"])),
        ("50 Day Average", raw(&summary["fiftyDayAverage"])),
        ("200 Day Average", raw(&summary["twoHundredDayAverage"])),
        ("Website", raw(&profile["website"])),
        ("Summary", raw(&profile["longBusinessSummary"])),
        ("Analyst Recommendation", raw(&financial["recommendationKey"])),
        ("Number Of Analyst Opinions", raw(&financial["numberOfAnalystOpinions"])),
        ("Employees", raw(&profile["fullTimeEmployees"])),
        ("Total Cash", raw(&financial["totalCash"])),
        ("Free Cash flow", raw(&financial["freeCashflow"])),
        ("Operating Cash flow", raw(&financial["operatingCashflow"])),
        ("EBITDA", raw(&financial["ebitda"])),
        ("Revenue Growth", raw(&financial["revenueGrowth"])),
        ("Gross Margins", raw(&financial["grossMargins"])),
        ("Ebitda Margins", raw(&financial["ebitdaMargins"])),
    ];

    Some(
        fields
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
            .collect(),
    )
}

/// News items from the search endpoint.
pub fn parse_company_news(json: &Value, num_stories: usize) -> Vec<Value> {
    json["news"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(num_stories)
                .map(|item| {
                    let published = item["providerPublishTime"]
                        .as_i64()
                        .and_then(|ts| DateTime::from_timestamp(ts, 0))
                        .map(|dt| dt.to_rfc3339());
                    serde_json::json!({
                        "title": item["title"],
                        "publisher": item["publisher"],
                        "link": item["link"],
                        "published_at": published,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_url_escapes_symbol() {
        let url = symbol_url(CHART_ENDPOINT, "nvda").unwrap();
        assert_eq!(url.as_str(), "https://query1.finance.yahoo.com/v8/finance/chart/NVDA");

        let url = symbol_url(QUOTE_SUMMARY_ENDPOINT, "brk/b?x#y").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query2.finance.yahoo.com/v10/finance/quoteSummary/BRK%2FB%3FX%23Y"
        );
        assert!(url.query().is_none());
    }

    #[test]
    fn test_parse_chart_price() {
        let json = serde_json::json!({
            "chart": { "result": [ { "meta": { "symbol": "NVDA", "regularMarketPrice": 140.12 } } ] }
        });
        assert_eq!(parse_chart_price(&json), Some(140.12));
        assert_eq!(format!("{:.4}", parse_chart_price(&json).unwrap()), "140.1200");

        let empty = serde_json::json!({ "chart": { "result": null, "error": { "code": "Not Found" } } });
        assert_eq!(parse_chart_price(&empty), None);
    }

    #[test]
    fn test_parse_analyst_recommendations() {
        let json = serde_json::json!({
            "quoteSummary": { "result": [ { "recommendationTrend": { "trend": [
                { "period": "0m", "strongBuy": 12, "buy": 40, "hold": 6, "sell": 1, "strongSell": 0, "extra": true },
                { "period": "-1m", "strongBuy": 11, "buy": 39, "hold": 7, "sell": 1, "strongSell": 0 }
            ] } } ] }
        });

        let trend = parse_analyst_recommendations(&json);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0]["period"], "0m");
        assert_eq!(trend[0]["buy"], 40);
        assert!(trend[0].get("extra").is_none());

        assert!(parse_analyst_recommendations(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn test_parse_company_info() {
        let json = serde_json::json!({
            "quoteSummary": { "result": [ {
                "assetProfile": {
                    "sector": "Technology",
                    "industry": "Semiconductors",
                    "city": "Santa Clara",
                    "fullTimeEmployees": 29600
                },
                "price": {
                    "longName": "NVIDIA Corporation",
                    "currency": "USD",
                    "marketCap": { "raw": 3400000000000u64, "fmt": "3.4T" }
                },
                "summaryDetail": { "trailingPE": { "raw": 65.3, "fmt": "65.30" }, "fiftyTwoWeekLow": {} },
                "financialData": { "currentPrice": { "raw": 140.12, "fmt": "140.12" }, "recommendationKey": "buy" },
                "defaultKeyStatistics": {}
            } ] }
        });

        let info = parse_company_info("nvda", &json).unwrap();
        assert_eq!(info["Name"], "NVIDIA Corporation");
        assert_eq!(info["Symbol"], "NVDA");
        assert_eq!(info["Current Stock Price"], "140.12 USD");
        assert_eq!(info["Market Cap"], "3400000000000 USD");
        assert_eq!(info["P/E Ratio"], 65.3);
        assert_eq!(info["Employees"], 29600);
        assert_eq!(info["Analyst Recommendation"], "buy");
        assert!(!info.contains_key("52 Week Low"));
        assert!(!info.contains_key("EPS"));

        assert!(parse_company_info("nvda", &serde_json::json!({ "quoteSummary": { "result": [] } })).is_none());
    }

    #[test]
    fn test_parse_company_news() {
        let json = serde_json::json!({
            "news": [
                { "title": "A", "publisher": "Reuters", "link": "https://a", "providerPublishTime": 1700000000 },
                { "title": "B", "publisher": "AP", "link": "https://b" },
                { "title": "C", "publisher": "AP", "link": "https://c" }
            ]
        });

        let news = parse_company_news(&json, 2);
        assert_eq!(news.len(), 2);
        assert_eq!(news[0]["publisher"], "Reuters");
        assert_eq!(news[0]["published_at"], "2023-11-14T22:13:20+00:00");
        assert!(news[1]["published_at"].is_null());
    }
}
