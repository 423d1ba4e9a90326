mod common;

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use pharos_batch::api::HttpHelper;
use pharos_batch::commands::{run_faucet, run_faucet_loop};
use pharos_batch::config::{BotConfig, FaucetConfig, RetrySettings};
use pharos_batch::pipeline::faucet::{STEP_FAUCET, STEP_LOGIN, STEP_SIGN_IN, STEP_STATUS};
use pharos_batch::pipeline::Outcome;
use pharos_batch::util::shutdown::channel;
use pharos_batch::util::{RetryPolicy, Shutdown};

use crate::common::KEYS;

const JWT: &str = "jwt-token";

/// Key file with one malformed line between two valid keys
fn write_keys(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("privatekey.txt");
    let content = format!("{}\n0xnot-a-key\n\n0x{}\n", KEYS[0], KEYS[1]);
    std::fs::write(&path, content).unwrap();
    path
}

fn config(server: &MockServer, dir: &TempDir) -> BotConfig {
    BotConfig {
        key_file: write_keys(dir.path()),
        invite_file: dir.path().join("reff.txt"),
        retry: RetrySettings {
            max_attempts: 2,
            base_delay_ms: 0,
            ..RetrySettings::default()
        },
        faucet: FaucetConfig {
            api_url: server.base_url(),
            account_pause_ms: 0,
            ..FaucetConfig::default()
        },
        ..BotConfig::default()
    }
}

#[tokio::test]
async fn full_flow_records_every_step_and_streak() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("reff.txt"), "INVITE42\n").unwrap();

    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/user/login")
                .query_param_exists("signature")
                .query_param("invite_code", "INVITE42");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"jwt": JWT}}));
        })
        .await;
    let sign_in = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/sign/in")
                .header("authorization", "Bearer jwt-token");
            then.status(200).json_body(json!({"code": 0}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sign/status");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"consecutiveDays": 3}}));
        })
        .await;
    let claim = server
        .mock_async(|when, then| {
            when.method(POST).path("/faucet/daily");
            then.status(201).json_body(json!({"code": 0}));
        })
        .await;

    let result = run_faucet(&config(&server, &dir), Shutdown::never())
        .await
        .unwrap();

    assert_eq!(result.entries.len(), 2);
    let addresses: Vec<_> = result.reports().map(|r| r.address).collect();
    assert_ne!(addresses[0], addresses[1]);
    for entry in &result.entries {
        assert_eq!(entry.report.outcome(), Outcome::Succeeded);
        assert_eq!(entry.output, Some(Some(3)));
    }
    login.assert_hits_async(2).await;
    sign_in.assert_hits_async(2).await;
    claim.assert_hits_async(2).await;
}

#[tokio::test]
async fn failed_login_skips_remaining_steps() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();

    server
        .mock_async(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"code": 1, "msg": "bad signature"}));
        })
        .await;
    let sign_in = server
        .mock_async(|when, then| {
            when.method(POST).path("/sign/in");
            then.status(200).json_body(json!({"code": 0}));
        })
        .await;

    let result = run_faucet(&config(&server, &dir), Shutdown::never())
        .await
        .unwrap();

    assert_eq!(result.entries.len(), 2);
    for report in result.reports() {
        let login = report.step(STEP_LOGIN).unwrap();
        assert_eq!(login.outcome, Outcome::Failed);
        assert_eq!(login.note.as_deref(), Some("login failed"));
        for step in [STEP_SIGN_IN, STEP_STATUS, STEP_FAUCET] {
            assert_eq!(report.step(step).unwrap().outcome, Outcome::Skipped);
        }
    }
    sign_in.assert_hits_async(0).await;
}

#[tokio::test]
async fn rejected_claim_keeps_server_message() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();

    server
        .mock_async(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"jwt": JWT}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/sign/in");
            then.status(200).json_body(json!({"code": 0}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sign/status");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/faucet/daily");
            then.status(200)
                .json_body(json!({"code": 1, "msg": "faucet did not cooldown"}));
        })
        .await;

    let result = run_faucet(&config(&server, &dir), Shutdown::never())
        .await
        .unwrap();

    let report = &result.entries[0].report;
    assert_eq!(report.step(STEP_LOGIN).unwrap().outcome, Outcome::Succeeded);
    assert_eq!(report.step(STEP_SIGN_IN).unwrap().outcome, Outcome::Succeeded);
    assert_eq!(report.step(STEP_STATUS).unwrap().outcome, Outcome::Failed);
    let faucet = report.step(STEP_FAUCET).unwrap();
    assert_eq!(faucet.outcome, Outcome::Failed);
    assert_eq!(faucet.note.as_deref(), Some("faucet did not cooldown"));
    assert_eq!(result.entries[0].output, Some(None));
}

#[tokio::test]
async fn missing_key_file_makes_no_requests() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    let login = server
        .mock_async(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200);
        })
        .await;

    let mut config = config(&server, &dir);
    config.key_file = dir.path().join("absent.txt");
    let result = run_faucet(&config, Shutdown::never()).await.unwrap();

    assert!(result.entries.is_empty());
    login.assert_hits_async(0).await;
}

#[tokio::test]
async fn helper_gives_up_after_all_attempts() {
    let server = MockServer::start_async().await;
    let down = server
        .mock_async(|when, then| {
            when.method(GET).path("/down");
            then.status(503);
        })
        .await;

    let helper = HttpHelper::new(&FaucetConfig::default(), RetryPolicy::immediate(3)).unwrap();
    let response = helper
        .send(reqwest::Method::GET, &server.url("/down"), &[], None)
        .await;

    assert!(response.is_none());
    down.assert_hits_async(3).await;
}

#[tokio::test]
async fn helper_sends_null_bearer_before_login() {
    let server = MockServer::start_async().await;
    let ok = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/ping")
                .header("authorization", "Bearer null")
                .header_exists("origin");
            then.status(200);
        })
        .await;

    let helper = HttpHelper::new(&FaucetConfig::default(), RetryPolicy::immediate(1)).unwrap();
    let response = helper
        .send(reqwest::Method::GET, &server.url("/ping"), &[], None)
        .await;

    assert!(response.is_some());
    ok.assert_async().await;
}

#[tokio::test]
async fn loop_repeats_passes_until_stopped() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    let login = server
        .mock_async(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"code": 1, "msg": "bad signature"}));
        })
        .await;

    let (trigger, shutdown) = channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.trigger();
    });

    let config = config(&server, &dir);
    let looped = tokio::time::timeout(
        Duration::from_secs(5),
        run_faucet_loop(&config, Some(Duration::from_millis(20)), shutdown),
    )
    .await;

    assert!(matches!(looped, Ok(Ok(()))));
    // two wallets per pass, at least two passes
    assert!(login.hits_async().await >= 4);
}
