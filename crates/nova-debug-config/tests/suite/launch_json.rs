use std::sync::Arc;

use nova_debug_config::gateway::VALIDATE_LAUNCH_CONFIG;
use nova_debug_config::{
    CancellationToken, Collaborators, DebugConfigurationProvider, DebugSettings, LaunchConfigStore,
    LaunchJsonFile, Platform, ProviderOptions, ReleaseFileInspector, WorkspaceFolder,
};
use serde_json::{json, Value};

use super::support::{object, CountingSink, FakeEditor, FakeLanguageServer, FakeProcesses, ScriptedHost};

#[tokio::test]
async fn fix_is_written_to_launch_json_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let folder = WorkspaceFolder::new("app", dir.path());
    let stored = json!({
        "type": "java",
        "name": "Launch App",
        "request": "launch",
        "mainClass": "a.Mian",
        "linux": { "vmArgs": "-Xmx1g" },
    });
    std::fs::create_dir_all(dir.path().join(".vscode")).unwrap();
    std::fs::write(
        dir.path().join(".vscode/launch.json"),
        serde_json::to_string_pretty(&json!({
            "version": "0.2.0",
            "configurations": [stored.clone()],
        }))
        .unwrap(),
    )
    .unwrap();

    let server = Arc::new(FakeLanguageServer::new());
    server.respond(
        VALIDATE_LAUNCH_CONFIG,
        json!({
            "mainClass": { "isValid": false, "message": "missing" },
            "projectName": { "isValid": true },
            "proposals": [{ "mainClass": "a.Main", "projectName": "p" }],
        }),
    );
    let host = Arc::new(ScriptedHost::default());
    host.answer(Some("Fix"));
    host.choose(Some(0));
    let store = Arc::new(LaunchJsonFile::new());

    let provider = DebugConfigurationProvider::new(
        Collaborators {
            language_server: server,
            editor: Arc::new(FakeEditor::new()),
            host,
            store: store.clone(),
            processes: Arc::new(FakeProcesses::default()),
            runtime: Arc::new(ReleaseFileInspector),
            progress: Arc::new(CountingSink::default()),
        },
        DebugSettings::default(),
        ProviderOptions {
            platform: Platform::Linux,
            ..ProviderOptions::default()
        },
    );

    let config = provider
        .resolve(Some(&folder), object(stored), &CancellationToken::new())
        .await
        .expect("fixed configuration resolves");
    assert_eq!(config.main_class.as_deref(), Some("a.Main"));
    assert_eq!(config.vm_args_text(), Some("-Xmx1g"));

    let persisted = store.read_configurations(Some(&folder)).await.unwrap();
    assert_eq!(
        persisted,
        vec![json!({
            "type": "java",
            "name": "Launch App",
            "request": "launch",
            "mainClass": "a.Main",
            "projectName": "p",
            "linux": { "vmArgs": "-Xmx1g" },
        })]
    );

    let text = std::fs::read_to_string(dir.path().join(".vscode/launch.json")).unwrap();
    let document: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(document["version"], "0.2.0");
}
