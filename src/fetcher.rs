use async_trait::async_trait;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    redirect, Client,
};
use tracing::{debug, warn};
use url::Url;

use crate::{config::FetchConfig, domain::FetchResult};

/// Anything that can produce a page for the monitor loop.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url, identity_hint: usize) -> FetchResult;
}

#[derive(Debug, Clone, Copy)]
struct BrowserIdentity {
    user_agent: &'static str,
    client_hints: Option<&'static str>,
    platform: &'static str,
}

const IDENTITIES: &[BrowserIdentity] = &[
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        client_hints: Some("\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
        platform: "\"Windows\"",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        client_hints: Some("\"Chromium\";v=\"123\", \"Google Chrome\";v=\"123\", \"Not:A-Brand\";v=\"8\""),
        platform: "\"macOS\"",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        client_hints: None,
        platform: "\"Windows\"",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        client_hints: None,
        platform: "\"macOS\"",
    },
];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-IN,en-GB;q=0.9,en-US;q=0.8,en;q=0.7";

/// Plain HTTP fetcher with rotating browser-like headers.
pub struct PageFetcher {
    client: Client,
    config: FetchConfig,
}

impl PageFetcher {
    pub fn new(config: FetchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()?;
        if config.impersonate_browser {
            debug!(
                target: "fetch",
                "TLS fingerprint impersonation unavailable; using the extended browser header profile"
            );
        }
        Ok(Self { client, config })
    }

    fn headers_for(&self, url: &Url, identity_hint: usize) -> HeaderMap {
        let identity = IDENTITIES[identity_hint % IDENTITIES.len()];
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(identity.user_agent));
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
        if let Ok(referer) = HeaderValue::from_str(&origin_of(url)) {
            headers.insert(header::REFERER, referer);
        }

        if self.config.impersonate_browser {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
            headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
            headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
            headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
            headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
            headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
            if let Some(hints) = identity.client_hints {
                headers.insert("sec-ch-ua", HeaderValue::from_static(hints));
                headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
                headers.insert("sec-ch-ua-platform", HeaderValue::from_static(identity.platform));
            }
        }
        headers
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &Url, identity_hint: usize) -> FetchResult {
        let response = match self
            .client
            .get(url.clone())
            .headers(self.headers_for(url, identity_hint))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(target: "fetch", error = %err, url = %url, "request failed");
                return FetchResult::transport_error(describe_error(&err, &self.config));
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                debug!(target: "fetch", status, bytes = body.len(), "page fetched");
                FetchResult::response(status, body)
            }
            Err(err) => {
                warn!(target: "fetch", error = %err, url = %url, "failed to read body");
                FetchResult::transport_error(format!("failed to read body: {err}"))
            }
        }
    }
}

fn origin_of(url: &Url) -> String {
    format!("{}/", url.origin().ascii_serialization())
}

fn describe_error(err: &reqwest::Error, config: &FetchConfig) -> String {
    if err.is_timeout() {
        format!("request timed out after {}s", config.timeout.as_secs_f32())
    } else if err.is_redirect() {
        format!("gave up after {} redirects", config.max_redirects)
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}
