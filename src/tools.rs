//! Web search tool handed to the analyst and researcher agents.
//!
//! Scrapes DuckDuckGo's HTML endpoint, which needs no API key. Results are
//! read from the `result__a` anchors (title and redirect link) and the
//! `result__snippet` element that follows each one.

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search request failed with HTTP {0}")]
    Http(u16),

    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchTool {
    max_results: usize,
    endpoint: String,
    /// Pause before each request to stay under the provider's rate limit
    delay: Duration,
}

impl WebSearchTool {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            delay: Duration::from_millis(500),
        }
    }

    /// Point the tool at another HTML search endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        info!(query = %query, "Performing web search");

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let results = parse_results(&body, self.max_results);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }
        Ok(results)
    }
}

/// Extract up to `limit` unique results from a DuckDuckGo HTML page
fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for block in html.split("class=\"result__a\"").skip(1) {
        if results.len() >= limit {
            break;
        }
        let Some(url) = attr_value(block, "href").and_then(resolve_link) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let title = element_text(block).unwrap_or_else(|| url.clone());
        let snippet = block
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(element_text)
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
    }

    results
}

/// Value of the first `name="..."` attribute in `fragment`
fn attr_value<'a>(fragment: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{}=\"", name);
    let start = fragment.find(&marker)? + marker.len();
    let len = fragment[start..].find('"')?;
    Some(&fragment[start..start + len])
}

/// Turn a result href into the target URL. DuckDuckGo wraps targets in a
/// `/l/?uddg=<encoded>` redirect; links back into duckduckgo.com are ads.
fn resolve_link(href: &str) -> Option<String> {
    let href = href.replace("&amp;", "&");
    let url = if let Some(pos) = href.find("uddg=") {
        let encoded = href[pos + 5..].split('&').next()?;
        urlencoding::decode(encoded).ok()?.into_owned()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        href
    };

    if !url.starts_with("http") || host_of(&url)?.ends_with("duckduckgo.com") {
        return None;
    }
    Some(url)
}

fn host_of(url: &str) -> Option<&str> {
    url.split("//").nth(1)?.split('/').next()
}

/// Text content of the element whose opening tag starts `fragment`.
/// Inline markup such as `<b>` is dropped.
fn element_text(fragment: &str) -> Option<String> {
    let start = fragment.find('>')? + 1;
    let inner = &fragment[start..];
    let end = ["</a>", "</div>", "</td>"]
        .iter()
        .filter_map(|close| inner.find(close))
        .min()?;

    let mut text = String::new();
    let mut in_tag = false;
    for c in inner[..end].chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = decode_entities(text.trim());
    (!text.is_empty()).then_some(text)
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchArgs {
    pub query: String,
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";

    type Args = SearchArgs;
    type Output = String;
    type Error = SearchError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web. Use it to look at a website's search presence, \
                          find competing sites and gather facts about them."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query, e.g. a domain name or a keyword"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let results = self.search(&args.query).await?;
        Ok(format_results(&args.query, &results))
    }
}

/// Render results as the markdown list the model sees
fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {}", query);
    }

    let lines: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. **{}**\n   URL: {}\n   {}", i + 1, r.title, r.url, r.snippet))
        .collect();

    format!("## Search Results for: {}\n\n{}", query, lines.join("\n\n"))
}
