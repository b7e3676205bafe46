use super::*;
use crate::camera::SyntheticCamera;
use crate::config::FocusConfig;
use crate::engine::EngineState;
use crate::error::FocusError;
use crate::models::{ObjectScript, Scenario, ScenarioLoader};
use std::io;
use std::sync::Arc;
use std::time::Duration;

fn create_test_config() -> FocusConfig {
    let mut config = FocusConfig::default();
    config.camera.resolution = (64, 48);
    config.camera.fps = 20;
    config
}

fn create_test_app(scenario: Scenario, camera: SyntheticCamera) -> FocusApp {
    FocusApp::with_components(
        create_test_config(),
        Arc::new(camera),
        Arc::new(ScenarioLoader::new(scenario)),
        AlertPresenter::with_writer(Box::new(io::sink()), true),
    )
    .unwrap()
}

fn phone_scenario() -> Scenario {
    Scenario {
        object_ticks: vec![ObjectScript::with(&[("cell phone", 0.9)])],
        ..Scenario::default()
    }
}

#[tokio::test]
async fn test_app_creation_with_demo_scenario() {
    let app = FocusApp::new(create_test_config()).await.unwrap();

    assert_eq!(app.engine().state(), EngineState::Idle);
    assert!(!app.alerts().is_alerting());
    assert_eq!(app.config().camera.fps, 20);
}

#[tokio::test]
async fn test_missing_scenario_file_fails() {
    let mut config = create_test_config();
    config.models.scenario_path = Some("/nonexistent/focuswatch/scenario.json".to_string());

    let result = FocusApp::new(config).await;

    assert!(matches!(result, Err(FocusError::Io(_))));
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
#[tokio::test]
async fn test_gstreamer_backend_requires_feature() {
    use crate::config::CameraBackend;

    let mut config = create_test_config();
    config.camera.backend = CameraBackend::Gstreamer;

    let result = FocusApp::new(config).await;

    assert!(matches!(result, Err(FocusError::Camera(_))));
}

#[tokio::test(start_paused = true)]
async fn test_toggle_command_starts_and_stops() {
    let camera = SyntheticCamera::new(create_test_config().camera);
    let app = create_test_app(Scenario::default(), camera);

    assert!(app
        .handle_command(Some(AppCommand::ToggleDetection))
        .await
        .is_none());
    assert_eq!(app.engine().state(), EngineState::Running);

    assert!(app
        .handle_command(Some(AppCommand::ToggleDetection))
        .await
        .is_none());
    assert_eq!(app.engine().state(), EngineState::Idle);
}

#[tokio::test]
async fn test_quit_command_requests_shutdown() {
    let camera = SyntheticCamera::new(create_test_config().camera);
    let app = create_test_app(Scenario::default(), camera);

    let reason = app.handle_command(Some(AppCommand::Quit)).await;

    assert_eq!(reason, Some(ShutdownReason::UserRequest));
}

#[tokio::test(start_paused = true)]
async fn test_alerts_follow_engine_verdicts() {
    let camera = SyntheticCamera::new(create_test_config().camera);
    let mut app = create_test_app(phone_scenario(), camera);

    app.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(750)).await;

    assert!(app.alerts().is_alerting());
    assert_eq!(app.alerts().bell_count(), 1);

    let exit_code = app.shutdown(&ShutdownReason::UserRequest).await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(app.engine().state(), EngineState::Idle);
    assert!(!app.alerts().is_alerting());
    assert!(app.alerts().banner().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_autostart_failure_without_keyboard() {
    let camera = SyntheticCamera::unavailable(create_test_config().camera);
    let mut app = create_test_app(Scenario::default(), camera);

    let result = app.start(true).await;

    assert!(matches!(result, Err(FocusError::Camera(_))));
    assert_eq!(app.engine().state(), EngineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_with_unavailable_camera_stays_idle() {
    let camera = SyntheticCamera::unavailable(create_test_config().camera);
    let app = create_test_app(Scenario::default(), camera);

    assert!(app
        .handle_command(Some(AppCommand::ToggleDetection))
        .await
        .is_none());
    assert_eq!(app.engine().state(), EngineState::Idle);
}

#[tokio::test]
async fn test_run_exits_on_quit() {
    let camera = SyntheticCamera::new(create_test_config().camera);
    let mut app = create_test_app(phone_scenario(), camera);

    app.start(true).await.unwrap();
    app.commands().send(AppCommand::Quit).unwrap();

    let exit_code = app.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(app.engine().state(), EngineState::Idle);
}

#[tokio::test]
async fn test_run_twice_fails() {
    let camera = SyntheticCamera::new(create_test_config().camera);
    let mut app = create_test_app(Scenario::default(), camera);

    app.commands().send(AppCommand::Quit).unwrap();
    app.run().await.unwrap();

    assert!(matches!(app.run().await, Err(FocusError::System { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_signal_shutdown_stops_running_engine() {
    let camera = SyntheticCamera::new(create_test_config().camera);
    let mut app = create_test_app(phone_scenario(), camera);

    app.start(true).await.unwrap();
    assert_eq!(app.engine().state(), EngineState::Running);

    let exit_code = app
        .shutdown(&ShutdownReason::Signal("SIGTERM".to_string()))
        .await
        .unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(app.engine().state(), EngineState::Idle);
}
