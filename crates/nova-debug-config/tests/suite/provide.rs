use nova_debug_config::gateway::RESOLVE_MAIN_CLASS;
use serde_json::json;

use super::support::{folder, Harness};

#[tokio::test]
async fn current_file_entry_comes_first_then_one_per_main_class() {
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_MAIN_CLASS,
        json!([
            { "mainClass": "com.example.tools.Main", "projectName": "tools" },
            { "mainClass": "com.example.App", "projectName": "app" },
            { "mainClass": "com.example.Main", "projectName": "app" },
            { "mainClass": "com.example.App", "projectName": "app" },
        ]),
    );

    let configurations = harness.provider.provide_configurations(Some(&folder())).await;
    let names: Vec<&str> = configurations.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(
        names,
        vec!["Current File", "Launch App", "Launch Main(app)", "Launch Main(tools)"]
    );
    assert_eq!(configurations[0].main_class.as_deref(), Some("${file}"));
    assert_eq!(configurations[1].project_name.as_deref(), Some("app"));
    assert!(configurations
        .iter()
        .all(|c| c.type_ == "java" && c.request.as_deref() == Some("launch")));
    assert_eq!(
        harness.server.calls_to(RESOLVE_MAIN_CLASS),
        vec![vec![json!("file:///ws/app")]]
    );
}

#[tokio::test]
async fn inactive_tooling_still_offers_current_file() {
    let harness = Harness::new();
    harness.server.set_active(false);

    let configurations = harness.provider.provide_configurations(None).await;

    assert_eq!(configurations.len(), 1);
    assert_eq!(configurations[0].name, "Current File");
    assert!(harness.host.messages()[0]
        .text
        .starts_with("Language Support for Java is required."));
}

#[tokio::test]
async fn repeated_names_within_a_project_are_numbered() {
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_MAIN_CLASS,
        json!([
            { "mainClass": "a.Main", "projectName": "app" },
            { "mainClass": "b.Main", "projectName": "app" },
            { "mainClass": "c.Main" },
            { "mainClass": "d.Main" },
        ]),
    );

    let configurations = harness.provider.provide_configurations(Some(&folder())).await;
    let names: Vec<&str> = configurations.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(
        names,
        vec![
            "Current File",
            "Launch Main(app)",
            "Launch Main(app) (2)",
            "Launch Main",
            "Launch Main (2)",
        ]
    );
    assert_eq!(configurations[2].main_class.as_deref(), Some("b.Main"));
}
