//! Web tools: brave_web_search and fetch_web_page.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::base::Tool;

/// Shared user-agent string.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Maximum response body size (5 MB). Prevents memory spikes on large responses.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

const BRAVE_SEARCH_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove HTML tags and decode entities.
fn strip_tags(text: &str) -> String {
    // Remove script and style blocks.
    let re_script = Regex::new(r"(?is)<script[\s\S]*?</script>").unwrap();
    let text = re_script.replace_all(text, "");
    let re_style = Regex::new(r"(?is)<style[\s\S]*?</style>").unwrap();
    let text = re_style.replace_all(&text, "");
    // Remove remaining tags.
    let re_tags = Regex::new(r"<[^>]+>").unwrap();
    let text = re_tags.replace_all(&text, "");
    html_escape::decode_html_entities(&text).trim().to_string()
}

/// Normalize whitespace: collapse runs of spaces/tabs, limit consecutive newlines.
fn normalize_whitespace(text: &str) -> String {
    let re_spaces = Regex::new(r"[ \t]+").unwrap();
    let text = re_spaces.replace_all(text, " ");
    let re_newlines = Regex::new(r"\n{3,}").unwrap();
    re_newlines.replace_all(&text, "\n\n").trim().to_string()
}

/// Validate a URL: must be http(s) with a valid, non-private domain.
///
/// Blocks local/private addresses to prevent SSRF attacks where the LLM
/// might be tricked into fetching internal services.
fn validate_url(url_str: &str) -> Result<(), String> {
    let parsed = Url::parse(url_str).map_err(|e| format!("Invalid URL: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("Only http/https allowed, got '{}'", other)),
    }
    let host = parsed.host_str().ok_or("Missing domain")?;

    // Block known private/local hostnames.
    let lower = host.to_lowercase();
    if lower == "localhost"
        || lower == "0.0.0.0"
        || lower.ends_with(".local")
        || lower.ends_with(".internal")
    {
        return Err(format!("Access to local host '{}' is blocked", host));
    }

    // Block private/reserved IP ranges (RFC 1918, link-local, loopback, metadata).
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        let blocked = match ip {
            std::net::IpAddr::V4(v4) => {
                v4.is_loopback()
                    || v4.is_private()
                    || v4.is_link_local()
                    || v4.is_unspecified()
            }
            std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
        if blocked {
            return Err(format!("Access to private/local IP '{}' is blocked", ip));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// BraveWebSearchTool
// ---------------------------------------------------------------------------

/// Search the web using the Brave Search API.
pub struct BraveWebSearchTool {
    api_key: String,
    client: Client,
}

impl BraveWebSearchTool {
    /// Create a new web search tool.
    ///
    /// If `api_key` is `None`, the `BRAVE_API_KEY` environment variable is
    /// checked. Passing `Some("")` explicitly disables env fallback.
    pub fn new(api_key: Option<String>) -> Self {
        let resolved_key = match api_key {
            Some(key) => key,
            None => std::env::var("BRAVE_API_KEY").unwrap_or_default(),
        };

        Self {
            api_key: resolved_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Tool for BraveWebSearchTool {
    fn name(&self) -> &str {
        "brave_web_search"
    }

    fn description(&self) -> &str {
        "Search the web using Brave Search API. The responses here only contain summaries. Use fetch_web_page to get the full contents of interesting search results."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "the search query to submit to Brave"
                },
                "count": {
                    "type": "integer",
                    "description": "the number of results to return, defaults to 10"
                }
            },
            "required": ["query"]
        })
    }

    fn returns(&self) -> &str {
        "Object - a JSON object containing search results or error information from the Brave Search API"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let query = match params.get("query").and_then(|v| v.as_str()) {
            Some(q) => q,
            None => return "Error: 'query' parameter is required".to_string(),
        };

        if self.api_key.is_empty() {
            return "Error: BRAVE_API_KEY not configured".to_string();
        }

        let count = params
            .get("count")
            .and_then(|v| v.as_u64())
            .map(|n| n.clamp(1, 20))
            .unwrap_or(10);

        let response = match self
            .client
            .get(BRAVE_SEARCH_ENDPOINT)
            .query(&[("q", query), ("count", &count.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return format!("Error: {}", e),
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return format!("Error: Brave Search returned HTTP {}: {}", status, body);
        }

        let data = match response.json::<serde_json::Value>().await {
            Ok(d) => d,
            Err(e) => return format!("Error parsing search results: {}", e),
        };

        let results: Vec<serde_json::Value> = data
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .map(|arr| {
                arr.iter()
                    .take(count as usize)
                    .map(|item| {
                        json!({
                            "title": item.get("title").and_then(|v| v.as_str()).unwrap_or(""),
                            "url": item.get("url").and_then(|v| v.as_str()).unwrap_or(""),
                            "description": item.get("description").and_then(|v| v.as_str()).unwrap_or(""),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        serde_json::to_string_pretty(&json!({
            "query": query,
            "result_count": results.len(),
            "results": results,
        }))
        .unwrap_or_else(|e| format!("Error formatting search results: {}", e))
    }
}

// ---------------------------------------------------------------------------
// FetchWebPageTool
// ---------------------------------------------------------------------------

/// Fetch content from a URL, optionally cleaned down to readable text.
pub struct FetchWebPageTool {
    client: Client,
}

impl FetchWebPageTool {
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for FetchWebPageTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchWebPageTool {
    fn name(&self) -> &str {
        "fetch_web_page"
    }

    fn description(&self) -> &str {
        "Fetch content from a specified URL. This is a good tool to use after doing a brave_web_search, in order to get more details from interesting search results."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "the URL to fetch content from"
                },
                "headers": {
                    "type": "object",
                    "description": "custom headers to include in the request, defaults to a standard User-Agent"
                },
                "timeout": {
                    "type": "integer",
                    "description": "request timeout in seconds, defaults to 30"
                },
                "clean": {
                    "type": "boolean",
                    "description": "whether to extract only the main content, defaults to true"
                }
            },
            "required": ["url"]
        })
    }

    fn returns(&self) -> &str {
        "String - the cleaned web page content as text, or an error object if the request fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let url = match params.get("url").and_then(|v| v.as_str()) {
            Some(u) => u,
            None => return "Error: 'url' parameter is required".to_string(),
        };
        let timeout = params
            .get("timeout")
            .and_then(|v| v.as_u64())
            .unwrap_or(30);
        let clean = params.get("clean").and_then(|v| v.as_bool()).unwrap_or(true);

        if let Err(e) = validate_url(url) {
            return format!("Error: URL validation failed: {}", e);
        }

        let mut request = self.client.get(url).timeout(Duration::from_secs(timeout));
        if let Some(headers) = params.get("headers").and_then(|v| v.as_object()) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key.as_str(), v);
                }
            }
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return format!("Error fetching {}: {}", url, e),
        };

        let status = response.status();
        if !status.is_success() {
            return format!("Error: HTTP {} fetching {}", status, url);
        }

        // Check content-length header; reject obviously oversized responses early.
        if let Some(len) = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if len > MAX_BODY_BYTES {
                return format!(
                    "Error: Response too large ({:.1} MB, limit {:.1} MB)",
                    len as f64 / 1e6,
                    MAX_BODY_BYTES as f64 / 1e6
                );
            }
        }

        // Read body with size guard (content-length can be absent or wrong).
        let body = match response.bytes().await {
            Ok(bytes) if bytes.len() > MAX_BODY_BYTES => {
                return format!(
                    "Error: Response too large ({:.1} MB, limit {:.1} MB)",
                    bytes.len() as f64 / 1e6,
                    MAX_BODY_BYTES as f64 / 1e6
                );
            }
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return format!("Error reading response body: {}", e),
        };

        if clean {
            normalize_whitespace(&strip_tags(&body))
        } else {
            body
        }
    }
}
