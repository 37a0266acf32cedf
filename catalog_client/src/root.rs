use std::{ collections::HashMap, num::NonZeroU32, sync::Arc, time::Duration };
use std::time::{ Instant, SystemTime, UNIX_EPOCH };
use async_trait::async_trait;
use dotenv::dotenv;
use governor::{ Quota, RateLimiter, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use rand::Rng;
use reqwest::Client;
use reqwest::header::{ HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT };
use thiserror::Error;
use tracing::{ debug, info, warn };
use url::Url;

use crate::graphql::{ GraphqlRequest, GraphqlResponse, GraphqlTransport };

pub const DEFAULT_TOKEN_HEADER: &str = "X-Shopify-Storefront-Access-Token";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http {status}: {body}")] Http {
        status: u16,
        body: String,
    },
    #[error("network: {0}")] Net(#[from] reqwest::Error),
    #[error("json: {0}")] Json(#[from] serde_json::Error),
    #[error("config: {0}")] Config(String),
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub endpoint: Url,
    pub access_token: Option<String>,
    pub token_header: String,
    pub rps: u32,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_secs: u64,
    pub extra_headers: HashMap<String, String>,
}

impl CatalogConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            access_token: None,
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            rps: 4,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            timeout_secs: 20,
            extra_headers: HashMap::new(),
        }
    }

    /// Build config from `CATALOG_*` env vars (after loading `.env`).
    /// Only `CATALOG_API_URL` is required.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenv().ok();
        let raw_url = std::env
            ::var("CATALOG_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ClientError::Config("missing env var CATALOG_API_URL".into()))?;
        let endpoint = Url::parse(raw_url.trim()).map_err(|e|
            ClientError::Config(format!("invalid CATALOG_API_URL {raw_url:?}: {e}"))
        )?;

        let mut cfg = Self::new(endpoint);
        cfg.access_token = std::env
            ::var("CATALOG_ACCESS_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Ok(h) = std::env::var("CATALOG_TOKEN_HEADER") {
            if !h.trim().is_empty() {
                cfg.token_header = h.trim().to_string();
            }
        }
        cfg.rps = env_parse("CATALOG_RPS", cfg.rps);
        cfg.retry_attempts = env_parse("CATALOG_RETRY_ATTEMPTS", cfg.retry_attempts);
        cfg.retry_base_delay_ms = env_parse("CATALOG_RETRY_BASE_DELAY_MS", cfg.retry_base_delay_ms);
        cfg.timeout_secs = env_parse("CATALOG_TIMEOUT_SECS", cfg.timeout_secs);
        if let Ok(raw) = std::env::var("CATALOG_EXTRA_HEADERS") {
            cfg.extra_headers = parse_extra_headers(&raw);
        }
        Ok(cfg)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env
        ::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// `k1=v1,k2=v2` → map. Entries without `=` or with an empty key are skipped.
pub fn parse_extra_headers(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// HTTP client for the storefront GraphQL endpoint.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    cfg: Arc<CatalogConfig>,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl CatalogClient {
    pub fn new(cfg: CatalogConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("catalog-client/", env!("CARGO_PKG_VERSION")))
        );

        if let Some(token) = &cfg.access_token {
            let name = HeaderName::from_bytes(cfg.token_header.as_bytes()).map_err(|e|
                ClientError::Config(format!("invalid token header name: {e}"))
            )?;
            let value = HeaderValue::from_str(token).map_err(|e|
                ClientError::Config(format!("invalid access token: {e}"))
            )?;
            headers.insert(name, value);
        }

        for (k, v) in &cfg.extra_headers {
            let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e|
                ClientError::Config(format!("invalid header name {k:?}: {e}"))
            )?;
            let val = HeaderValue::from_str(v).map_err(|e|
                ClientError::Config(format!("invalid header value for {k:?}: {e}"))
            )?;
            headers.insert(name, val);
        }

        let http = Client::builder()
            .default_headers(headers)
            .gzip(true)
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .pool_idle_timeout(Duration::from_secs(300))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        let rps = NonZeroU32::new(cfg.rps.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(rps));

        Ok(Self {
            http,
            cfg: Arc::new(cfg),
            limiter: Arc::new(limiter),
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.cfg
    }

    /// POST one operation. Transport failures, 5xx and 429 are retried with
    /// exponential backoff; other non-2xx statuses fail immediately. GraphQL
    /// `errors` are returned to the caller, not raised.
    pub async fn post_graphql(
        &self,
        request: &GraphqlRequest
    ) -> Result<GraphqlResponse, ClientError> {
        let op = request.operation_name.as_deref().unwrap_or("anonymous");
        let max_attempts = self.cfg.retry_attempts.max(1);
        let mut delay = Duration::from_millis(self.cfg.retry_base_delay_ms.max(1));
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.limiter.until_ready().await;
            let t0 = Instant::now();
            let req_id = format!(
                "{:x}-{}",
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0),
                attempt
            );
            debug!(op=%op, req_id=%req_id, url=%self.cfg.endpoint, "catalog graphql request");

            let resp = match self.http.post(self.cfg.endpoint.clone()).json(request).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, op=%op, error=?e, "catalog graphql network error");
                    if attempt >= max_attempts {
                        return Err(ClientError::Net(e));
                    }
                    sleep_with_jitter(&mut delay).await;
                    continue;
                }
            };

            let status = resp.status();
            let body = match resp.text().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(attempt, op=%op, error=?e, "catalog graphql body read error");
                    if attempt >= max_attempts {
                        return Err(ClientError::Net(e));
                    }
                    sleep_with_jitter(&mut delay).await;
                    continue;
                }
            };

            let elapsed = t0.elapsed().as_millis();
            info!(op=%op, req_id=%req_id, status=%status.as_u16(), body_len=body.len(), elapsed_ms=%elapsed, "catalog graphql response");

            if !status.is_success() {
                let status_u16 = status.as_u16();
                let retryable = status.is_server_error() || status_u16 == 429;
                if retryable && attempt < max_attempts {
                    warn!(status=%status_u16, attempt, op=%op, "catalog graphql retryable status");
                    sleep_with_jitter(&mut delay).await;
                    continue;
                }
                let sample_body: String = body.chars().take(200).collect();
                warn!(status=%status_u16, op=%op, sample_body=%sample_body, "catalog graphql request failed");
                return Err(ClientError::Http { status: status_u16, body: sample_body });
            }

            let parsed: GraphqlResponse = serde_json::from_str(&body)?;
            if parsed.has_errors() {
                debug!(op=%op, errors=parsed.errors.len(), "catalog graphql returned errors");
            }
            return Ok(parsed);
        }
    }
}

async fn sleep_with_jitter(delay: &mut Duration) {
    let base_ms = delay.as_millis() as u64;
    let jitter_ms = rand::thread_rng().gen_range(0..=base_ms / 4);
    tokio::time::sleep(*delay + Duration::from_millis(jitter_ms)).await;
    *delay = delay.saturating_mul(2);
}

#[async_trait]
impl GraphqlTransport for CatalogClient {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError> {
        self.post_graphql(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_headers_skip_malformed_pairs() {
        let headers = parse_extra_headers("x-a=1, x-b = two ,garbage,=empty");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-a").map(String::as_str), Some("1"));
        assert_eq!(headers.get("x-b").map(String::as_str), Some("two"));
    }

    #[test]
    fn new_config_uses_defaults() {
        let cfg = CatalogConfig::new(Url::parse("https://shop.example.com/api/graphql.json").unwrap());
        assert_eq!(cfg.rps, 4);
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.token_header, DEFAULT_TOKEN_HEADER);
        assert!(cfg.access_token.is_none());
    }

    #[test]
    fn client_rejects_invalid_header_name() {
        let mut cfg = CatalogConfig::new(Url::parse("https://shop.example.com/graphql").unwrap());
        cfg.extra_headers.insert("bad header".into(), "v".into());
        let err = CatalogClient::new(cfg).err().expect("invalid header must fail");
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn http_error_display_includes_status() {
        let err = ClientError::Http { status: 502, body: "bad gateway".into() };
        assert_eq!(err.to_string(), "http 502: bad gateway");
    }
}
