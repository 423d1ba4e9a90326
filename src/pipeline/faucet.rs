use alloy::signers::SignerSync;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::accounts::Account;
use crate::api::{ApiEnvelope, FaucetApi};
use crate::pipeline::batch::AccountTask;
use crate::pipeline::outcome::{AccountReport, StepOutcome};
use crate::pipeline::report::short_address;

pub const STEP_LOGIN: &str = "login";
pub const STEP_SIGN_IN: &str = "sign-in";
pub const STEP_STATUS: &str = "status";
pub const STEP_FAUCET: &str = "faucet";

/// Daily check-in: login, sign-in, status and faucet claim for each account
pub struct FaucetPipeline {
    api: FaucetApi,
    invite_code: String,
    login_message: String,
}

impl FaucetPipeline {
    pub fn new(api: FaucetApi, invite_code: String, login_message: String) -> Self {
        Self {
            api,
            invite_code,
            login_message,
        }
    }

    fn sign_challenge(&self, account: &Account) -> Result<String> {
        let signature = account
            .signer
            .sign_message_sync(self.login_message.as_bytes())
            .with_context(|| "Failed to sign login message")?;
        Ok(alloy::hex::encode_prefixed(signature.as_bytes()))
    }

    async fn login(&self, account: &Account) -> Result<String> {
        let signature = self.sign_challenge(account)?;
        self.api
            .login(account.address, &signature, &self.invite_code)
            .await
    }
}

/// Map an API reply onto a step: `code == 0` succeeds, anything else fails
/// with the server message
fn api_step(step: &str, reply: &Result<ApiEnvelope>) -> StepOutcome {
    match reply {
        Ok(envelope) if envelope.is_ok() => StepOutcome::succeeded(step),
        Ok(envelope) => StepOutcome::failed(step, envelope.note().unwrap_or("-")),
        Err(e) => StepOutcome::failed(step, e.to_string()),
    }
}

#[async_trait]
impl AccountTask for FaucetPipeline {
    /// Sign-in streak reported by the status call
    type Output = Option<u64>;

    async fn process(
        &self,
        account: &Account,
        report: &mut AccountReport,
        streak_out: &mut Option<u64>,
    ) {
        let addr = short_address(&account.address);

        let jwt = match self.login(account).await {
            Ok(jwt) => {
                report.push(StepOutcome::succeeded(STEP_LOGIN));
                jwt
            }
            Err(e) => {
                warn!("[{}] {}: login failed: {:#}", account.index, addr, e);
                report.push(StepOutcome::failed(STEP_LOGIN, "login failed"));
                for step in [STEP_SIGN_IN, STEP_STATUS, STEP_FAUCET] {
                    report.push(StepOutcome::skipped(step, "login failed"));
                }
                return;
            }
        };

        let sign_in = self.api.sign_in(account.address, &jwt).await;
        report.push(api_step(STEP_SIGN_IN, &sign_in));

        let status = self.api.status(account.address, &jwt).await;
        let streak = status.as_ref().ok().and_then(ApiEnvelope::streak);
        *streak_out = streak;
        let mut status_step = api_step(STEP_STATUS, &status);
        if let Some(days) = streak {
            status_step = status_step.with_note(format!("streak {}", days));
        }
        report.push(status_step);

        let claim = self.api.claim_faucet(account.address, &jwt).await;
        let claim_step = api_step(STEP_FAUCET, &claim);
        match &claim_step.note {
            None => info!("[{}] {}: faucet claimed", account.index, addr),
            Some(note) => warn!("[{}] {}: faucet not claimed: {}", account.index, addr, note),
        }
        report.push(claim_step);
    }
}
