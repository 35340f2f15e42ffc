//! Integration tests for the shell runtime
//!
//! Each test runs a real load against a local HTTP server and checks the
//! scene, the URL field and the persisted file.

use arview::LoadStatus;
use arview::protocol::{Event, LifecycleEvent, LoadErrorKind, RepeatCount};
use arview_loader::testing::{Route, TestServer, animated_glb, static_glb, temp_dir};
use arview_shell::{Runtime, ShellConfig};
use std::net::TcpListener;
use std::path::PathBuf;

/// Helper to create a runtime that has been initialized and has appeared
fn create_runtime(name: &str) -> (Runtime, PathBuf) {
    let home = temp_dir(&format!("shell-{}", name));
    let mut runtime = Runtime::new(&ShellConfig::new(&home)).expect("Failed to create runtime");
    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Init));
    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Appear));
    (runtime, home)
}

/// Camera and light nodes attached by Init and Appear
const FIXED_ROOT_CHILDREN: usize = 2;

#[tokio::test]
async fn test_successful_load_hides_field() {
    let server = TestServer::start(vec![Route::ok("/robot.glb", animated_glb())]);
    let (mut runtime, home) = create_runtime("success");

    assert!(runtime.view().url_field().is_visible());
    runtime.submit(&server.url("/robot.glb"));
    assert!(!runtime.view().url_field().is_keyboard_shown());
    assert_eq!(runtime.pending_loads(), 1);

    runtime.wait_for_loads().await;

    assert!(matches!(runtime.status(), LoadStatus::Complete { .. }));
    assert!(!runtime.view().url_field().is_visible());
    assert_eq!(
        runtime.view().scene().root_child_count(),
        FIXED_ROOT_CHILDREN + 1
    );
    assert_eq!(runtime.pending_loads(), 0);

    let written = std::fs::read(home.join("model.glb")).expect("Model file missing");
    assert_eq!(written, animated_glb());

    let _ = std::fs::remove_dir_all(&home);
}

#[tokio::test]
async fn test_only_first_animation_plays_forever() {
    let server = TestServer::start(vec![Route::ok("/robot.glb", animated_glb())]);
    let (mut runtime, _home) = create_runtime("animations");

    runtime.submit(&server.url("/robot.glb"));
    runtime.wait_for_loads().await;

    let scene = runtime.view().scene();
    assert_eq!(scene.animations().len(), 2);

    let playing: Vec<_> = scene.playing().collect();
    assert_eq!(playing.len(), 1);
    assert_eq!(playing[0].clip.name.as_deref(), Some("Bounce"));

    for bound in scene.animations() {
        for channel in &bound.clip.channels {
            assert_eq!(channel.repeat, RepeatCount::Infinite);
        }
    }
}

#[tokio::test]
async fn test_repeated_loads_accumulate() {
    let server = TestServer::start(vec![Route::ok("/robot.glb", animated_glb())]);
    let (mut runtime, _home) = create_runtime("accumulate");

    for _ in 0..3 {
        runtime.submit(&server.url("/robot.glb"));
        runtime.wait_for_loads().await;
    }

    assert_eq!(runtime.core().attached_models(), 3);
    assert_eq!(
        runtime.view().scene().root_child_count(),
        FIXED_ROOT_CHILDREN + 3
    );
    assert_eq!(server.request_count(), 3);
}

#[tokio::test]
async fn test_overlapping_loads_both_attach() {
    let server = TestServer::start(vec![
        Route::ok("/robot.glb", animated_glb()),
        Route::ok("/single.glb", static_glb()),
    ]);
    let (mut runtime, home) = create_runtime("overlap");

    // Second submit before the first load has finished
    runtime.submit(&server.url("/robot.glb"));
    runtime.submit(&server.url("/single.glb"));
    assert_eq!(runtime.pending_loads(), 2);

    runtime.wait_for_loads().await;

    assert_eq!(runtime.pending_loads(), 0);
    assert_eq!(runtime.core().attached_models(), 2);
    assert_eq!(
        runtime.view().scene().root_child_count(),
        FIXED_ROOT_CHILDREN + 2
    );
    assert!(matches!(runtime.status(), LoadStatus::Complete { .. }));
    assert!(!runtime.view().url_field().is_visible());

    let written = std::fs::read(home.join("model.glb")).expect("Model file missing");
    assert!(written == animated_glb() || written == static_glb());
}

#[tokio::test]
async fn test_404_keeps_field_visible() {
    let server = TestServer::start(vec![]);
    let (mut runtime, home) = create_runtime("not-found");

    runtime.submit(&server.url("/missing.glb"));
    runtime.wait_for_loads().await;

    match runtime.status() {
        LoadStatus::Failed { failure, .. } => {
            assert_eq!(failure.kind, LoadErrorKind::HttpStatus);
            assert_eq!(failure.status_code, Some(404));
        }
        other => panic!("Expected Failed status, got {:?}", other),
    }
    assert!(runtime.view().url_field().is_visible());
    assert_eq!(runtime.view().scene().root_child_count(), FIXED_ROOT_CHILDREN);
    assert!(!home.join("model.glb").exists());
}

#[tokio::test]
async fn test_invalid_url_is_not_fetched() {
    let server = TestServer::start(vec![]);
    let (mut runtime, home) = create_runtime("invalid-url");

    runtime.submit("not a url");
    runtime.wait_for_loads().await;

    match runtime.status() {
        LoadStatus::Failed { failure, .. } => assert_eq!(failure.kind, LoadErrorKind::InvalidUrl),
        other => panic!("Expected Failed status, got {:?}", other),
    }
    assert_eq!(server.request_count(), 0);
    assert!(!home.join("model.glb").exists());
}

#[tokio::test]
async fn test_failure_after_success_keeps_model() {
    let server = TestServer::start(vec![Route::ok("/robot.glb", animated_glb())]);
    let (mut runtime, _home) = create_runtime("fail-after-success");

    runtime.submit(&server.url("/robot.glb"));
    runtime.wait_for_loads().await;
    runtime.submit(&server.url("/missing.glb"));
    runtime.wait_for_loads().await;

    assert!(matches!(runtime.status(), LoadStatus::Failed { .. }));
    assert_eq!(
        runtime.view().scene().root_child_count(),
        FIXED_ROOT_CHILDREN + 1
    );
    // Hidden by the first load, nothing shows it again
    assert!(!runtime.view().url_field().is_visible());
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_load() {
    // Accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });

    let (mut runtime, home) = create_runtime("shutdown");
    runtime.submit(&format!("http://{}/slow.glb", addr));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(runtime.pump(), 0);

    runtime.shutdown().await;

    assert!(matches!(runtime.status(), LoadStatus::Cancelled { .. }));
    assert_eq!(runtime.pending_loads(), 0);
    assert!(runtime.view().url_field().is_visible());
    assert!(!home.join("model.glb").exists());
}

#[tokio::test]
async fn test_appear_twice_adds_one_light() {
    let (mut runtime, _home) = create_runtime("reappear");

    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Disappear));
    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Appear));

    assert_eq!(runtime.view().scene().lights().count(), 1);
    assert_eq!(runtime.view().session().run_count(), 2);
}

#[tokio::test]
async fn test_run_with_urls() {
    let server = TestServer::start(vec![Route::ok("/robot.glb", animated_glb())]);
    let home = temp_dir("shell-run");

    let mut config = ShellConfig::new(&home);
    config.urls = vec![server.url("/robot.glb"), server.url("/missing.glb")];

    let report = arview_shell::run(config).await.expect("Run failed");

    assert!(matches!(report.status, LoadStatus::Failed { .. }));
    assert_eq!(report.models_attached, 1);
    assert_eq!(report.root_children, FIXED_ROOT_CHILDREN + 1);
    assert!(report.to_string().contains("failed"));
}
