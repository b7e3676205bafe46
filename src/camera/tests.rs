use super::*;
use crate::config::{CameraBackend, CameraConfig};
use crate::error::{CameraError, FocusError};
use std::time::Duration;

fn create_test_camera_config() -> CameraConfig {
    CameraConfig {
        index: 0,
        resolution: (64, 48),
        fps: 20,
        backend: CameraBackend::Synthetic,
    }
}

#[tokio::test(start_paused = true)]
async fn test_synthetic_camera_delivers_frames() {
    let camera = SyntheticCamera::new(create_test_camera_config());
    assert!(!camera.is_acquired());

    let mut stream = camera.acquire().await.unwrap();
    stream.wait_playing().await.unwrap();

    let frame = stream.latest().unwrap();
    assert!(frame.has_dimensions());
    assert_eq!(frame.data.len(), 64 * 48 * 3);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(camera.frame_count() > 1);
    assert!(stream.is_live());

    camera.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_acquire_twice_reuses_stream() {
    let camera = SyntheticCamera::new(create_test_camera_config());

    let _first = camera.acquire().await.unwrap();
    let _second = camera.acquire().await.unwrap();

    assert_eq!(camera.acquisitions(), 1);
    assert!(camera.is_acquired());

    camera.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_release_is_idempotent_and_detaches() {
    let camera = SyntheticCamera::new(create_test_camera_config());
    let stream = camera.acquire().await.unwrap();

    camera.release().await;
    camera.release().await;

    assert!(!camera.is_acquired());
    assert!(!stream.is_live());
}

#[tokio::test]
async fn test_unavailable_camera_fails_fast() {
    let camera = SyntheticCamera::unavailable(create_test_camera_config());

    let err = camera.acquire().await.unwrap_err();
    assert!(matches!(err, CameraError::DeviceUnavailable { .. }));
    assert!(!camera.is_acquired());
    assert_eq!(camera.acquisitions(), 0);

    camera.set_available(true);
    assert!(camera.acquire().await.is_ok());
    camera.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_stream_is_not_live() {
    let camera = SyntheticCamera::new(create_test_camera_config());
    let mut stream = camera.acquire().await.unwrap();
    stream.wait_playing().await.unwrap();

    camera.interrupt();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!stream.is_live());
    // Still held until released
    assert!(camera.is_acquired());
    camera.release().await;
}

#[tokio::test]
async fn test_builder_validation() {
    let result = FrameSourceBuilder::new().build();
    assert!(matches!(result, Err(FocusError::System { .. })));

    let source = FrameSourceBuilder::new()
        .config(create_test_camera_config())
        .build()
        .unwrap();
    assert!(!source.is_acquired());
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
#[test]
fn test_gstreamer_backend_requires_feature() {
    let config = CameraConfig {
        backend: CameraBackend::Gstreamer,
        ..create_test_camera_config()
    };

    let result = FrameSourceBuilder::new().config(config).build();
    assert!(matches!(
        result,
        Err(FocusError::Camera(CameraError::Configuration { .. }))
    ));
}
