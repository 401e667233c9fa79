//! Web search tool backed by the DuckDuckGo HTML endpoint

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use pith_agent::{Tool, ToolError};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Default number of hits returned to the model
pub const DEFAULT_RESULT_LIMIT: usize = 5;

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; pith/", env!("CARGO_PKG_VERSION"), ")");

static RESULT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*>(.*?)</a>"#).unwrap());
static RESULT_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(?:a|div|td)[^>]*class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#)
        .unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search service returned HTTP {0}")]
    Status(u16),
}

/// The search boundary: query in, at most `limit` hits out
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Scrapes DuckDuckGo's no-JavaScript results page
pub struct DuckDuckGo {
    client: reqwest::Client,
}

impl DuckDuckGo {
    pub fn new() -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGo {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(DDG_HTML_URL)
            .form(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        Ok(parse_results(&html, limit))
    }
}

/// Pair result titles with their snippets, in page order
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let titles = RESULT_TITLE.captures_iter(html).map(|c| clean(&c[1]));
    let snippets: Vec<String> = RESULT_SNIPPET
        .captures_iter(html)
        .map(|c| clean(&c[1]))
        .collect();

    titles
        .enumerate()
        .map(|(i, title)| SearchHit {
            title,
            body: snippets.get(i).cloned().unwrap_or_default(),
        })
        .filter(|hit| !hit.title.is_empty())
        .take(limit)
        .collect()
}

/// Strip markup, decode the common entities and collapse whitespace
fn clean(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, "");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// The `web_search` tool advertised to the model
pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
    limit: usize,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}

fn query_of(arguments: &serde_json::Value) -> Option<&str> {
    arguments
        .get("query")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns a short list of results with a title and a body snippet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    fn subject(&self, arguments: &serde_json::Value) -> String {
        format!("query '{}'", query_of(arguments).unwrap_or_default())
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        cancel: CancellationToken,
    ) -> Result<serde_json::Value, ToolError> {
        let query = query_of(&arguments)
            .ok_or_else(|| ToolError::InvalidArguments("'query' must be a non-empty string".into()))?;

        let searched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Failed("search cancelled".into())),
            hits = self.backend.search(query, self.limit) => hits,
        };
        let hits = searched.map_err(|e| ToolError::Failed(e.to_string()))?;

        tracing::debug!(query, hits = hits.len(), "search completed");
        serde_json::to_value(hits).map_err(|e| ToolError::Failed(e.to_string()))
    }
}
