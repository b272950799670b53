use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::UpstreamError;

const USER_AGENT: &str = "SolDashboard/1.0";
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq)]
pub struct WebcamImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The external data sources polled and proxied by the service
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch_status(&self) -> Result<Value, UpstreamError>;

    async fn fetch_webcam(&self) -> Result<WebcamImage, UpstreamError>;

    async fn fetch_token(&self) -> Result<Value, UpstreamError>;
}

pub struct HttpUpstream {
    http: reqwest::Client,
    status_url: String,
    webcam_url: String,
    token_url: String,
}

impl HttpUpstream {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(HttpUpstream {
            http,
            status_url: config.status_url().to_owned(),
            webcam_url: config.webcam_url().to_owned(),
            token_url: config.token_url().to_owned(),
        })
    }

    async fn get(
        &self,
        upstream: &'static str,
        url: &str,
        json: bool,
    ) -> Result<reqwest::Response, UpstreamError> {
        debug!("Fetching {} from {}", upstream, url);
        let mut request = self
            .http
            .get(url)
            .query(&[("t", Utc::now().timestamp_millis())]);
        if json {
            request = request.header(ACCEPT, "application/json");
        }

        let resp = request
            .send()
            .await
            .map_err(|source| UpstreamError::Transport { upstream, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                upstream,
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn get_json(&self, upstream: &'static str, url: &str) -> Result<Value, UpstreamError> {
        let body = self
            .get(upstream, url, true)
            .await?
            .bytes()
            .await
            .map_err(|source| UpstreamError::Transport { upstream, source })?;
        serde_json::from_slice(&body).map_err(|source| UpstreamError::Payload { upstream, source })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch_status(&self) -> Result<Value, UpstreamError> {
        self.get_json("status", &self.status_url).await
    }

    async fn fetch_webcam(&self) -> Result<WebcamImage, UpstreamError> {
        let upstream = "webcam";
        let resp = self.get(upstream, &self.webcam_url, false).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_owned();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| UpstreamError::Transport { upstream, source })?;

        Ok(WebcamImage {
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn fetch_token(&self) -> Result<Value, UpstreamError> {
        self.get_json("token", &self.token_url).await
    }
}
