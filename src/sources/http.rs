use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{PodfeedError, PodfeedResult};

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; PodcastAggregator/1.0)";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request, described as data so it can be asserted on in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            json: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            json: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            json: Some(body),
            ..Self::post(url)
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }
}

/// Outbound HTTP. Returns the body of a 2xx response as text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> PodfeedResult<String>;
}

/// Fetch and decode a JSON body.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn HttpFetch,
    request: FetchRequest,
) -> PodfeedResult<T> {
    let body = fetcher.fetch(request).await?;
    Ok(serde_json::from_str(&body)?)
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> PodfeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, request: FetchRequest) -> PodfeedResult<String> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PodfeedError::HttpStatus {
                status: status.as_u16(),
                url: request.url,
            });
        }

        Ok(response.text().await?)
    }
}
