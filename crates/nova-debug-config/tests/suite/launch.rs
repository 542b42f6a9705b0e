use nova_debug_config::config::{ArgsValue, ShortenCommandLine};
use nova_debug_config::gateway::{
    file_uri, CHECK_PROJECT_SETTINGS, RESOLVE_CLASSPATH, RESOLVE_JAVA_EXECUTABLE,
    RESOLVE_MAIN_CLASS, RESOLVE_MAIN_METHOD, VALIDATE_LAUNCH_CONFIG,
};
use nova_debug_config::{CancellationToken, DebugSettings, Platform};
use serde_json::json;

use super::support::{folder, object, Harness};

#[tokio::test]
async fn single_candidate_is_picked_without_prompting() {
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_MAIN_CLASS,
        json!([{ "mainClass": "a.Main", "projectName": "p" }]),
    );

    let config = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "Launch", "request": "launch", "mainClass": "" })),
            &CancellationToken::new(),
        )
        .await
        .expect("launch resolves");

    assert_eq!(harness.host.prompt_count(), 0);
    assert_eq!(config.main_class.as_deref(), Some("a.Main"));
    assert_eq!(config.project_name.as_deref(), Some("p"));
    assert_eq!(config.class_paths, vec!["/p/bin".to_string()]);
    assert_eq!(config.java_exec.as_deref(), Some("/jdk/bin/java"));
    assert_eq!(config.cwd.as_deref(), Some("/ws/app"));
    assert!(config.is_launch_ready());
    assert_eq!(
        harness.server.calls_to(RESOLVE_CLASSPATH),
        vec![vec![json!("a.Main"), json!("p")]]
    );
}

#[tokio::test]
async fn accepted_fix_is_persisted_and_returned() {
    let harness = Harness::new();
    let stored = json!({
        "type": "java",
        "name": "Launch App",
        "request": "launch",
        "mainClass": "a.Mian",
    });
    *harness.store.configurations.lock() = vec![
        json!({ "type": "java", "name": "Attach", "request": "attach", "port": 5005 }),
        stored.clone(),
    ];
    harness.server.respond(
        VALIDATE_LAUNCH_CONFIG,
        json!({
            "mainClass": { "isValid": false, "message": "Main class 'a.Mian' doesn't exist in the workspace." },
            "projectName": { "isValid": true },
            "proposals": [
                { "mainClass": "b.Main", "projectName": "q" },
                { "mainClass": "a.Main", "projectName": "p" },
            ],
        }),
    );
    harness.host.answer(Some("Fix"));
    harness.host.choose(Some(0));

    let config = harness
        .provider
        .resolve(Some(&folder()), object(stored), &CancellationToken::new())
        .await
        .expect("fixed configuration resolves");

    assert_eq!(config.main_class.as_deref(), Some("a.Main"));
    assert_eq!(config.project_name.as_deref(), Some("p"));

    let persisted = harness.store.configurations.lock().clone();
    assert_eq!(*harness.store.writes.lock(), 1);
    assert_eq!(persisted[0]["name"], "Attach");
    assert_eq!(
        persisted[1],
        json!({
            "type": "java",
            "name": "Launch App",
            "request": "launch",
            "mainClass": "a.Main",
            "projectName": "p",
        })
    );

    let messages = harness.host.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.contains("a.Mian"));
    assert_eq!(messages[0].buttons, vec!["Fix", "Learn More"]);
}

#[tokio::test]
async fn dismissed_fix_abandons_without_writing() {
    let harness = Harness::new();
    harness.server.respond(
        VALIDATE_LAUNCH_CONFIG,
        json!({
            "mainClass": { "isValid": false, "message": "missing" },
            "projectName": { "isValid": true },
            "proposals": [{ "mainClass": "a.Main" }],
        }),
    );
    harness.host.answer(None);

    let outcome = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Mian" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    assert_eq!(*harness.store.writes.lock(), 0);
    assert_eq!(harness.host.messages().len(), 1);
}

#[tokio::test]
async fn missing_entry_points_report_the_folder() {
    let harness = Harness::new();
    harness.server.respond(RESOLVE_MAIN_CLASS, json!([]));

    let outcome = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "L", "request": "launch" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    let messages = harness.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].text,
        "Cannot find a class with the main method in the folder 'app'."
    );
    assert_eq!(messages[0].buttons, vec!["Learn More"]);
}

#[tokio::test]
async fn launch_ready_configuration_resolves_without_prompts() {
    let harness = Harness::new();
    let raw = json!({
        "type": "java",
        "name": "Launch App",
        "request": "launch",
        "mainClass": "a.Main",
        "projectName": "p",
        "classPaths": ["/p/bin", "/p/lib/dep.jar"],
        "javaExec": "/jdk/bin/java",
        "console": "internalConsole",
    });

    let first = harness
        .provider
        .resolve(Some(&folder()), object(raw.clone()), &CancellationToken::new())
        .await
        .expect("first resolution");
    let second = harness
        .provider
        .resolve(Some(&folder()), object(first.to_value().unwrap()), &CancellationToken::new())
        .await
        .expect("second resolution");

    assert_eq!(first, second);
    assert_eq!(second.main_class.as_deref(), Some("a.Main"));
    assert_eq!(second.class_paths, vec!["/p/bin", "/p/lib/dep.jar"]);
    assert_eq!(second.shorten_command_line, Some(ShortenCommandLine::None));
    assert_eq!(harness.host.prompt_count(), 0);
    assert!(harness.host.messages().is_empty());
    assert!(harness.server.calls_to(RESOLVE_CLASSPATH).is_empty());
    assert!(harness.server.calls_to(RESOLVE_JAVA_EXECUTABLE).is_empty());
}

#[tokio::test]
async fn cancellation_before_classpath_abandons_and_ends_progress_once() {
    let harness = Harness::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    harness
        .server
        .on_command(VALIDATE_LAUNCH_CONFIG, move || trigger.cancel());

    let outcome = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Main" })),
            &cancel,
        )
        .await;

    assert!(outcome.is_none());
    assert!(harness.server.calls_to(RESOLVE_CLASSPATH).is_empty());
    assert!(harness.host.messages().is_empty());
    assert_eq!(harness.sink.begins.lock().len(), 1);
    assert_eq!(harness.sink.ends.lock().len(), 1);
}

#[tokio::test]
async fn unsupported_request_is_reported() {
    let harness = Harness::new();

    let outcome = harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "R", "request": "restart" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    let messages = harness.host.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0]
        .text
        .contains("Request type \"restart\" is not supported"));
}

#[tokio::test]
async fn inactive_tooling_offers_installation() {
    let harness = Harness::new();
    harness.server.set_active(false);
    harness.host.answer(Some("Install"));

    let outcome = harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Main" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    let messages = harness.host.messages();
    assert!(messages[0].text.starts_with("Language Support for Java is required."));
    assert!(harness
        .editor
        .commands()
        .contains(&"workbench.extensions.installExtension".to_string()));
}

#[tokio::test]
async fn empty_configuration_is_synthesized() {
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_MAIN_CLASS,
        json!([{ "mainClass": "a.Main", "projectName": "p" }]),
    );

    let config = harness
        .provider
        .resolve(Some(&folder()), object(json!({})), &CancellationToken::new())
        .await
        .expect("synthesized launch");

    assert_eq!(config.type_, "java");
    assert_eq!(config.name, "Java Debug");
    assert_eq!(config.request.as_deref(), Some("launch"));
    assert_eq!(config.main_class.as_deref(), Some("a.Main"));
}

#[tokio::test]
async fn failed_build_can_be_cancelled() {
    let harness = Harness::new();
    *harness.editor.compile_status.lock() = 0;
    harness.host.answer(Some("Cancel"));

    let outcome = harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Main" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    assert_eq!(
        harness.host.messages()[0].text,
        "Build failed, do you want to continue?"
    );
    assert!(harness.server.calls_to(VALIDATE_LAUNCH_CONFIG).is_empty());
}

#[tokio::test]
async fn build_is_skipped_when_disabled() {
    let harness = Harness::builder()
        .settings(DebugSettings {
            force_build_before_launch: false,
            ..DebugSettings::default()
        })
        .build();

    harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Main" })),
            &CancellationToken::new(),
        )
        .await
        .expect("launch resolves");

    assert!(!harness
        .editor
        .commands()
        .contains(&"java.workspace.compile".to_string()));
}

#[tokio::test]
async fn windows_overrides_and_terminal_launch_adjustments() {
    let harness = Harness::builder()
        .platform(Platform::Windows)
        .launcher_script("C:\\ext\\scripts\\launcher.bat")
        .runtime(8)
        .build();

    let config = harness
        .provider
        .resolve(
            None,
            object(json!({
                "type": "java",
                "name": "L",
                "request": "launch",
                "mainClass": "a.Main",
                "classPaths": ["C:\\p\\bin", "C:\\p\\lib\\dep.jar"],
                "vmArgs": "-Xmx1g",
                "console": "integratedTerminal",
                "windows": { "vmArgs": ["-Xmx2g", "-Dname=a b"] },
                "linux": { "vmArgs": "-Xmx4g" },
            })),
            &CancellationToken::new(),
        )
        .await
        .expect("launch resolves");

    assert_eq!(
        config.vm_args,
        Some(ArgsValue::Text("-Xmx2g \"-Dname=a b\"".to_string()))
    );
    assert!(!config.extra.contains_key("windows"));
    assert!(!config.extra.contains_key("linux"));
    assert_eq!(config.shorten_command_line, Some(ShortenCommandLine::JarManifest));
    assert_eq!(
        config.launcher_script.as_deref(),
        Some("C:\\ext\\scripts\\launcher.bat")
    );
}

#[tokio::test]
async fn preview_projects_get_the_flag_once() {
    let harness = Harness::builder().runtime(21).build();
    harness.server.respond(CHECK_PROJECT_SETTINGS, json!(true));

    let config = harness
        .provider
        .resolve(
            None,
            object(json!({
                "type": "java",
                "name": "L",
                "request": "launch",
                "mainClass": "a.Main",
                "vmArgs": "--enable-preview -ea",
            })),
            &CancellationToken::new(),
        )
        .await
        .expect("launch resolves");

    assert_eq!(config.vm_args_text(), Some("--enable-preview -ea"));
}

#[tokio::test]
async fn preview_projects_reject_old_runtimes() {
    let harness = Harness::builder().runtime(11).build();
    harness.server.respond(CHECK_PROJECT_SETTINGS, json!(true));

    let outcome = harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Main" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    assert!(harness.host.messages()[0].text.contains("Java 11"));
}

#[tokio::test]
async fn correlated_progress_is_reused_and_stripped() {
    let harness = Harness::new();
    let reporter = harness.provider.progress_registry().create("Run a.Main");
    let id = reporter.id().to_string();
    drop(reporter);

    let config = harness
        .provider
        .resolve(
            None,
            object(json!({
                "type": "java",
                "name": "L",
                "request": "launch",
                "mainClass": "a.Main",
                "__progressId": id.clone(),
            })),
            &CancellationToken::new(),
        )
        .await
        .expect("launch resolves");

    assert!(config.progress_id.is_none());
    assert!(config.to_value().unwrap().get("__progressId").is_none());
    assert_eq!(*harness.sink.begins.lock(), vec![id.clone()]);
    assert_eq!(*harness.sink.ends.lock(), vec![id]);
}

#[tokio::test]
async fn classpath_placeholders_merge_with_resolved_paths() {
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_CLASSPATH,
        json!([[], ["/p/bin", "/p/lib/test.jar", "/p/lib/dep.jar"]]),
    );

    let config = harness
        .provider
        .resolve(
            None,
            object(json!({
                "type": "java",
                "name": "L",
                "request": "launch",
                "mainClass": "a.Main",
                "classPaths": ["$Auto", "!/p/lib/test.jar", "/extra/tools.jar"],
            })),
            &CancellationToken::new(),
        )
        .await
        .expect("launch resolves");

    assert_eq!(
        config.class_paths,
        vec!["/p/bin", "/p/lib/dep.jar", "/extra/tools.jar"]
    );
}

#[tokio::test]
async fn empty_resolved_paths_are_a_user_error() {
    let harness = Harness::new();
    harness.server.respond(RESOLVE_CLASSPATH, json!([[], []]));

    let outcome = harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": "a.Main" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    assert!(harness.host.messages()[0]
        .text
        .starts_with("Cannot resolve the modulepaths/classpaths automatically"));
}

fn java_source(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "class X { public static void main(String[] args) {} }").unwrap();
    path
}

#[tokio::test]
async fn file_path_with_one_entry_point_runs_it_without_prompting() {
    let dir = tempfile::tempdir().unwrap();
    let source = java_source(&dir, "Tool.java");
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_MAIN_METHOD,
        json!([{ "mainClass": "b.Tool", "projectName": "p", "filePath": source }]),
    );

    let config = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({
                "type": "java",
                "name": "Current File",
                "request": "launch",
                "mainClass": source,
            })),
            &CancellationToken::new(),
        )
        .await
        .expect("file target resolves");

    assert_eq!(config.main_class.as_deref(), Some("b.Tool"));
    assert_eq!(config.project_name.as_deref(), Some("p"));
    assert_eq!(harness.host.prompt_count(), 0);
    assert_eq!(
        harness.server.calls_to(RESOLVE_MAIN_METHOD),
        vec![vec![json!(file_uri(&source))]]
    );
    assert!(harness.server.calls_to(RESOLVE_MAIN_CLASS).is_empty());
    assert!(harness.server.calls_to(VALIDATE_LAUNCH_CONFIG).is_empty());
}

#[tokio::test]
async fn file_path_with_several_entry_points_prompts_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    let source = java_source(&dir, "Tools.java");
    let harness = Harness::new();
    harness.server.respond(
        RESOLVE_MAIN_METHOD,
        json!([
            { "mainClass": "b.Tool", "projectName": "p" },
            { "mainClass": "a.App", "projectName": "p" },
        ]),
    );
    harness.host.choose(Some(1));

    let config = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": source })),
            &CancellationToken::new(),
        )
        .await
        .expect("file target resolves");

    assert_eq!(harness.host.prompt_labels(), vec![vec!["a.App", "b.Tool"]]);
    assert_eq!(config.main_class.as_deref(), Some("b.Tool"));
}

#[tokio::test]
async fn active_editor_file_is_searched_when_no_main_class_is_set() {
    let dir = tempfile::tempdir().unwrap();
    let source = java_source(&dir, "App.java");
    let harness = Harness::new();
    *harness.host.active_file.lock() = Some(source.clone());
    harness.server.respond(
        RESOLVE_MAIN_METHOD,
        json!([{ "mainClass": "a.App", "projectName": "p" }]),
    );

    let config = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "L", "request": "launch" })),
            &CancellationToken::new(),
        )
        .await
        .expect("active file resolves");

    assert_eq!(config.main_class.as_deref(), Some("a.App"));
    assert_eq!(
        harness.server.calls_to(RESOLVE_MAIN_METHOD),
        vec![vec![json!(file_uri(&source))]]
    );
}

#[tokio::test]
async fn file_without_entry_points_falls_back_to_a_project_scan() {
    let dir = tempfile::tempdir().unwrap();
    let source = java_source(&dir, "Util.java");
    let harness = Harness::new();
    harness.server.respond(RESOLVE_MAIN_METHOD, json!([]));
    harness.server.respond(
        RESOLVE_MAIN_CLASS,
        json!([
            { "mainClass": "a.App", "projectName": "p" },
            { "mainClass": "b.Tool", "projectName": "p" },
        ]),
    );
    harness.host.choose(Some(0));

    let config = harness
        .provider
        .resolve(
            Some(&folder()),
            object(json!({ "type": "java", "name": "L", "request": "launch", "mainClass": source })),
            &CancellationToken::new(),
        )
        .await
        .expect("project scan resolves");

    assert_eq!(config.main_class.as_deref(), Some("a.App"));
    assert_eq!(harness.server.calls_to(RESOLVE_MAIN_CLASS).len(), 1);
    assert_eq!(
        *harness.host.placeholders.lock(),
        vec!["The file 'Util.java' is not executable, please select a main class you want to run."]
    );
}

#[tokio::test]
async fn missing_entry_points_without_a_folder_omit_the_folder_name() {
    let harness = Harness::new();
    harness.server.respond(RESOLVE_MAIN_CLASS, json!([]));

    let outcome = harness
        .provider
        .resolve(
            None,
            object(json!({ "type": "java", "name": "L", "request": "launch" })),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_none());
    assert_eq!(
        harness.host.messages()[0].text,
        "Cannot find a class with the main method."
    );
}
