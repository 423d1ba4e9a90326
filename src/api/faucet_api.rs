use alloy::primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::api::http::HttpHelper;
use crate::config::FaucetConfig;
use crate::util::RetryPolicy;

const STREAK_KEYS: [&str; 4] = ["consecutiveDays", "streak", "continueDays", "days"];

/// Common reply shape of the faucet API: `{"code": 0, "msg": "...", "data": {...}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEnvelope {
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    pub fn is_ok(&self) -> bool {
        self.code == Some(0)
    }

    /// Human readable message from the server, if any
    pub fn note(&self) -> Option<&str> {
        self.msg.as_deref().or(self.message.as_deref())
    }

    pub fn jwt(&self) -> Option<&str> {
        self.data.get("jwt").and_then(Value::as_str)
    }

    /// Consecutive sign-in days, under whichever key the server uses
    pub fn streak(&self) -> Option<u64> {
        STREAK_KEYS
            .iter()
            .find_map(|key| self.data.get(*key).and_then(Value::as_u64))
    }
}

#[derive(Clone, Debug)]
pub struct FaucetApi {
    http: HttpHelper,
    base_url: String,
}

impl FaucetApi {
    pub fn new(config: &FaucetConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            http: HttpHelper::new(config, retry)?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<ApiEnvelope> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .send(method, &url, query, bearer)
            .await
            .ok_or_else(|| anyhow!("no response from {}", path))?;

        response
            .json::<ApiEnvelope>()
            .await
            .with_context(|| format!("{} returned a non-JSON body", path))
    }

    /// Exchange a personal-sign signature for a session token
    pub async fn login(
        &self,
        address: Address,
        signature: &str,
        invite_code: &str,
    ) -> Result<String> {
        let address = address.to_string();
        let envelope = self
            .request(
                Method::POST,
                "/user/login",
                &[
                    ("address", address.as_str()),
                    ("signature", signature),
                    ("invite_code", invite_code),
                ],
                None,
            )
            .await?;

        if !envelope.is_ok() {
            bail!("login rejected: {}", envelope.note().unwrap_or("-"));
        }
        envelope
            .jwt()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("login reply carries no token"))
    }

    pub async fn sign_in(&self, address: Address, jwt: &str) -> Result<ApiEnvelope> {
        self.with_address(Method::POST, "/sign/in", address, jwt).await
    }

    pub async fn status(&self, address: Address, jwt: &str) -> Result<ApiEnvelope> {
        self.with_address(Method::GET, "/sign/status", address, jwt).await
    }

    pub async fn claim_faucet(&self, address: Address, jwt: &str) -> Result<ApiEnvelope> {
        self.with_address(Method::POST, "/faucet/daily", address, jwt).await
    }

    async fn with_address(
        &self,
        method: Method,
        path: &str,
        address: Address,
        jwt: &str,
    ) -> Result<ApiEnvelope> {
        let address = address.to_string();
        self.request(method, path, &[("address", address.as_str())], Some(jwt))
            .await
    }
}
