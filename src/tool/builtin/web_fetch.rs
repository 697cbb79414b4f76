use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use futures::StreamExt as _;
use html2text::from_read;
use reqwest::{redirect, Client, Url};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const MAX_REDIRECTS: u8 = 5;
const DEFAULT_MAX_LENGTH: usize = 50_000;

fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4 == std::net::Ipv4Addr::new(169, 254, 169, 254) // cloud metadata
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.to_ipv4_mapped().is_some_and(is_blocked_v4)
                || is_unique_local_or_link_local(&v6)
        }
    }
}

fn is_blocked_v4(v4: std::net::Ipv4Addr) -> bool {
    v4.is_loopback() || v4.is_private() || v4.is_link_local()
}

fn is_unique_local_or_link_local(ip: &std::net::Ipv6Addr) -> bool {
    let segments = ip.segments();
    (segments[0] & 0xfe00) == 0xfc00 || (segments[0] & 0xffc0) == 0xfe80
}

fn is_blocked_host_name(host: &str) -> bool {
    host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") || host == "metadata.google.internal"
}

/// Resolve `host:port` to a single IP, rejecting the URL if any candidate
/// resolves inside a blocked range. Returns the chosen address to pin the
/// connection to, closing the DNS-rebinding window between check and fetch.
async fn resolve_and_pin(host: &str, port: u16) -> Result<IpAddr, ToolError> {
    if is_blocked_host_name(host) {
        return Err(ToolError::PolicyDenied(format!("host not allowed: {host}")));
    }
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ToolError::Upstream(format!("DNS resolution failed for {host}: {e}")))?
        .collect();
    let Some(addr) = addrs.first() else {
        return Err(ToolError::Upstream(format!("DNS resolution returned no addresses for {host}")));
    };
    if is_blocked_ip(addr.ip()) {
        return Err(ToolError::PolicyDenied(format!("host resolves to a disallowed address: {host}")));
    }
    Ok(addr.ip())
}

fn assert_allowed_scheme(url: &Url) -> Result<(), ToolError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ToolError::ValidationError(format!("unsupported URL scheme: {scheme}"))),
    }
}

pub struct WebFetchTool {
    client: Client,
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebFetchTool {
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("coworker/0.1.0")
            .redirect(redirect::Policy::none())
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    async fn fetch_pinned(&self, url: &Url) -> Result<reqwest::Response, ToolError> {
        let host = url.host_str().ok_or_else(|| ToolError::ValidationError("URL has no host".into()))?.to_string();
        let port = url.port_or_known_default().unwrap_or(443);
        let pinned_ip = resolve_and_pin(&host, port).await?;

        let pinned_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("coworker/0.1.0")
            .redirect(redirect::Policy::none())
            .resolve(&host, SocketAddr::new(pinned_ip, port))
            .build()
            .map_err(|e| ToolError::Upstream(format!("failed to build pinned client: {e}")))?;

        pinned_client.get(url.clone()).send().await.map_err(|e| ToolError::Upstream(format!("request failed: {e}")))
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "webFetch"
    }

    fn description(&self) -> &str {
        "Fetch content from a URL. HTML is converted to readable plain text."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to fetch"},
                "maxLength": {"type": "integer", "description": "Maximum response length in characters (default: 50000)"}
            },
            "required": ["url"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let url_str = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("url is required".into()))?;
        let max_length = args.get("maxLength").and_then(serde_json::Value::as_u64).map_or(DEFAULT_MAX_LENGTH, |v| v as usize);

        let mut current = Url::parse(url_str).map_err(|e| ToolError::ValidationError(format!("invalid URL: {e}")))?;
        assert_allowed_scheme(&current)?;

        let mut response = self.fetch_pinned(&current).await?;
        let mut redirects = 0;
        while response.status().is_redirection() {
            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(ToolError::Upstream("too many redirects".into()));
            }
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ToolError::Upstream("redirect without Location header".into()))?;
            current = current.join(location).map_err(|e| ToolError::Upstream(format!("invalid redirect target: {e}")))?;
            assert_allowed_scheme(&current)?;
            response = self.fetch_pinned(&current).await?;
        }

        let status = response.status();
        let content_type =
            response.headers().get("content-type").and_then(|v| v.to_str().ok()).unwrap_or("unknown").to_string();

        if !status.is_success() {
            return Err(ToolError::Upstream(format!("HTTP {}", status.as_u16())));
        }

        let is_text = content_type.starts_with("text/")
            || content_type.contains("json")
            || content_type.contains("xml")
            || content_type.is_empty()
            || content_type == "unknown";
        if !is_text {
            return Err(ToolError::ValidationError(format!("non-text content type: {content_type}")));
        }

        let read_limit = max_length.saturating_add(1);
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ToolError::Upstream(format!("failed to read response body: {e}")))?;
            let remaining = read_limit.saturating_sub(bytes.len());
            if remaining == 0 {
                break;
            }
            let take = chunk.len().min(remaining);
            bytes.extend_from_slice(&chunk[..take]);
        }

        let raw_text = String::from_utf8_lossy(&bytes).into_owned();
        let is_html = content_type.contains("text/html") || content_type.contains("application/xhtml");
        let processed_text = if is_html { from_read(raw_text.as_bytes(), 80).unwrap_or(raw_text) } else { raw_text };

        let content = if processed_text.chars().count() > max_length {
            processed_text.chars().take(max_length).collect::<String>()
        } else {
            processed_text
        };

        Ok(ToolResult {
            content,
            is_error: false,
            metadata: Some(json!({"status": status.as_u16(), "contentType": content_type})),
        })
    }
}
