use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, warn};

use crate::config::FaucetConfig;
use crate::util::RetryPolicy;

/// Thin request wrapper for the faucet API.
///
/// Knows nothing about payloads: a call either produces a 200/201 response
/// within the retry budget or `None`.
#[derive(Clone, Debug)]
pub struct HttpHelper {
    client: Client,
    retry: RetryPolicy,
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).with_context(|| format!("Invalid header value: {:?}", value))
}

impl HttpHelper {
    pub fn new(config: &FaucetConfig, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ORIGIN, header_value(&config.origin)?);
        headers.insert(REFERER, header_value(&config.referer)?);
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .with_context(|| "Failed to build HTTP client")?;

        Ok(Self { client, retry })
    }

    /// Issue one request, retrying transport errors and non-2xx replies.
    /// `bearer` of `None` sends the literal `Bearer null` the API expects
    /// before login.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Option<Response> {
        let auth = format!("Bearer {}", bearer.unwrap_or("null"));

        let result = self
            .retry
            .run(|attempt| {
                debug!("{} {} (attempt {})", method, url, attempt + 1);
                let request = self
                    .client
                    .request(method.clone(), url)
                    .query(query)
                    .header(AUTHORIZATION, auth.as_str());
                async move {
                    let response = request.send().await?;
                    match response.status() {
                        StatusCode::OK | StatusCode::CREATED => Ok(response),
                        status => Err(anyhow!("{} returned HTTP {}", url, status)),
                    }
                }
            })
            .await;

        match result {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(
                    "Request to {} gave up after {} attempts: {:#}",
                    url, self.retry.max_attempts, e
                );
                None
            }
        }
    }
}
