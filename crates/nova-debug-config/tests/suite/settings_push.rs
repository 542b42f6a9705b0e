use nova_debug_config::gateway::UPDATE_DEBUG_SETTINGS;
use nova_debug_config::{CancellationToken, DebugSettings};
use serde_json::{json, Value};

use super::support::{object, Harness};

async fn attach(harness: &Harness) {
    harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "Attach", "request": "attach", "hostName": "localhost", "port": 5005 })),
            &CancellationToken::new(),
        )
        .await
        .expect("attach resolves");
}

fn pushed_payloads(harness: &Harness) -> Vec<Value> {
    harness
        .server
        .calls_to(UPDATE_DEBUG_SETTINGS)
        .into_iter()
        .map(|args| serde_json::from_str(args[0].as_str().unwrap()).unwrap())
        .collect()
}

#[tokio::test]
async fn first_resolution_pushes_settings_once() {
    let harness = Harness::new();
    assert!(harness.provider.is_settings_dirty());

    attach(&harness).await;
    attach(&harness).await;

    assert_eq!(pushed_payloads(&harness).len(), 1);
    assert!(!harness.provider.is_settings_dirty());
}

#[tokio::test]
async fn changes_without_a_session_wait_for_the_next_resolution() {
    let harness = Harness::new();
    attach(&harness).await;

    harness
        .provider
        .update_settings(
            DebugSettings {
                show_hex: true,
                log_level: "debug".into(),
                ..DebugSettings::default()
            },
            false,
        )
        .await;
    assert!(harness.provider.is_settings_dirty());
    assert_eq!(pushed_payloads(&harness).len(), 1);

    attach(&harness).await;
    let payloads = pushed_payloads(&harness);
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1]["showHex"], json!(true));
    assert_eq!(payloads[1]["logLevel"], json!("FINE"));
}

#[tokio::test]
async fn changes_during_a_session_are_pushed_immediately() {
    let harness = Harness::new();
    attach(&harness).await;

    harness.provider.on_settings_changed(true).await;

    assert_eq!(pushed_payloads(&harness).len(), 2);
    assert!(!harness.provider.is_settings_dirty());
}

#[tokio::test]
async fn failed_push_does_not_block_resolution() {
    let harness = Harness::new();
    harness.server.fail(UPDATE_DEBUG_SETTINGS, "language server restarting");

    attach(&harness).await;

    assert!(harness.host.messages().is_empty());
    assert!(!harness.provider.is_settings_dirty());
}
