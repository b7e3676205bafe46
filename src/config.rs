use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FocusConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    /// Generated blank frames, no hardware required
    Synthetic,
    /// V4L2 capture through GStreamer (requires the `camera` feature)
    Gstreamer,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second delivered by the source
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Which frame source implementation to use
    #[serde(default = "default_camera_backend")]
    pub backend: CameraBackend,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectionConfig {
    /// Period of both classifier timers in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Delay before the first face tick so the stream can settle
    #[serde(default = "default_face_startup_delay_ms")]
    pub face_startup_delay_ms: u64,

    /// Run the object (phone / pet / people) classifier family
    #[serde(default = "default_true")]
    pub object_detection_enabled: bool,

    /// Run the face (presence / gaze / eyes) classifier family
    #[serde(default = "default_true")]
    pub face_detection_enabled: bool,

    /// Start loading models when the engine is created instead of on first start
    #[serde(default = "default_true")]
    pub preload_models: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ThresholdConfig {
    /// Consecutive no-face ticks before the user counts as absent
    #[serde(default = "default_no_face_ticks")]
    pub no_face_ticks: u32,

    /// Consecutive looking-away ticks before the user counts as distracted
    #[serde(default = "default_looking_away_ticks")]
    pub looking_away_ticks: u32,

    /// Consecutive eyes-closed ticks before the user counts as dozing
    #[serde(default = "default_eyes_closed_ticks")]
    pub eyes_closed_ticks: u32,

    /// Nose deviation from the jaw midline, as a fraction of face width
    #[serde(default = "default_gaze_deviation_ratio")]
    pub gaze_deviation_ratio: f32,

    /// Eye height/width ratio below which an eye counts as closed
    #[serde(default = "default_eye_closed_ratio")]
    pub eye_closed_ratio: f32,

    /// "happy" expression score above which eyes count as closed
    #[serde(default = "default_happy_eyes_closed_score")]
    pub happy_eyes_closed_score: f32,

    /// Minimum detection score for an object prediction to count
    #[serde(default = "default_min_object_confidence")]
    pub min_object_confidence: f32,

    /// Number of people tolerated in frame before flagging company
    #[serde(default = "default_extra_person_count")]
    pub extra_person_count: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ModelConfig {
    /// JSON scenario driving the scripted classifier backends
    pub scenario_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl FocusConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("focuswatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.backend", "synthetic")?
            .set_default("detection.tick_interval_ms", default_tick_interval_ms())?
            .set_default(
                "detection.face_startup_delay_ms",
                default_face_startup_delay_ms(),
            )?
            .set_default("detection.object_detection_enabled", true)?
            .set_default("detection.face_detection_enabled", true)?
            .set_default("detection.preload_models", true)?
            .set_default("thresholds.no_face_ticks", default_no_face_ticks())?
            .set_default("thresholds.looking_away_ticks", default_looking_away_ticks())?
            .set_default("thresholds.eyes_closed_ticks", default_eyes_closed_ticks())?
            .set_default(
                "thresholds.gaze_deviation_ratio",
                default_gaze_deviation_ratio() as f64,
            )?
            .set_default(
                "thresholds.eye_closed_ratio",
                default_eye_closed_ratio() as f64,
            )?
            .set_default(
                "thresholds.happy_eyes_closed_score",
                default_happy_eyes_closed_score() as f64,
            )?
            .set_default(
                "thresholds.min_object_confidence",
                default_min_object_confidence() as f64,
            )?
            .set_default("thresholds.extra_person_count", default_extra_person_count())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // FOCUSWATCH__DETECTION__TICK_INTERVAL_MS=250
            .add_source(
                Environment::with_prefix("FOCUSWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: FocusConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.detection.tick_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Detection tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        let t = &self.thresholds;
        if t.no_face_ticks == 0 || t.looking_away_ticks == 0 || t.eyes_closed_ticks == 0 {
            return Err(ConfigError::Message(
                "Hysteresis thresholds must be at least one tick".to_string(),
            ));
        }

        for (name, value) in [
            ("gaze_deviation_ratio", t.gaze_deviation_ratio),
            ("eye_closed_ratio", t.eye_closed_ratio),
            ("happy_eyes_closed_score", t.happy_eyes_closed_score),
            ("min_object_confidence", t.min_object_confidence),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Message(format!(
                    "Threshold {} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl DetectionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn face_startup_delay(&self) -> Duration {
        Duration::from_millis(self.face_startup_delay_ms)
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            detection: DetectionConfig::default(),
            thresholds: ThresholdConfig::default(),
            models: ModelConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            resolution: default_camera_resolution(),
            fps: default_camera_fps(),
            backend: default_camera_backend(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            face_startup_delay_ms: default_face_startup_delay_ms(),
            object_detection_enabled: true,
            face_detection_enabled: true,
            preload_models: true,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            no_face_ticks: default_no_face_ticks(),
            looking_away_ticks: default_looking_away_ticks(),
            eyes_closed_ticks: default_eyes_closed_ticks(),
            gaze_deviation_ratio: default_gaze_deviation_ratio(),
            eye_closed_ratio: default_eye_closed_ratio(),
            happy_eyes_closed_score: default_happy_eyes_closed_score(),
            min_object_confidence: default_min_object_confidence(),
            extra_person_count: default_extra_person_count(),
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    15
}
fn default_camera_backend() -> CameraBackend {
    CameraBackend::Synthetic
}

fn default_tick_interval_ms() -> u64 {
    500
}
fn default_face_startup_delay_ms() -> u64 {
    500
}
fn default_true() -> bool {
    true
}

fn default_no_face_ticks() -> u32 {
    5
}
fn default_looking_away_ticks() -> u32 {
    3
}
fn default_eyes_closed_ticks() -> u32 {
    5
}
fn default_gaze_deviation_ratio() -> f32 {
    0.2
}
fn default_eye_closed_ratio() -> f32 {
    0.268
}
fn default_happy_eyes_closed_score() -> f32 {
    0.9
}
fn default_min_object_confidence() -> f32 {
    0.5
}
fn default_extra_person_count() -> u32 {
    1
}

fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FocusConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.detection.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.thresholds.no_face_ticks, 5);
        assert_eq!(config.thresholds.looking_away_ticks, 3);
        assert_eq!(config.thresholds.eyes_closed_ticks, 5);
        assert_eq!(config.camera.backend, CameraBackend::Synthetic);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = FocusConfig::load_from_file("/nonexistent/focuswatch.toml").unwrap();

        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.detection.face_startup_delay_ms, 500);
        assert!((config.thresholds.eye_closed_ratio - 0.268).abs() < 1e-6);
        assert!(config.models.scenario_path.is_none());
    }

    #[test]
    fn test_load_from_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[camera]
fps = 30

[detection]
tick_interval_ms = 250
face_detection_enabled = false

[thresholds]
looking_away_ticks = 4

[models]
scenario_path = "demo.json"
"#
        )
        .unwrap();

        let config = FocusConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.camera.fps, 30);
        assert_eq!(config.detection.tick_interval_ms, 250);
        assert!(!config.detection.face_detection_enabled);
        assert!(config.detection.object_detection_enabled);
        assert_eq!(config.thresholds.looking_away_ticks, 4);
        assert_eq!(config.thresholds.no_face_ticks, 5);
        assert_eq!(config.models.scenario_path.as_deref(), Some("demo.json"));
    }

    #[test]
    fn test_load_partial_file_fills_missing_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[detection]
tick_interval_ms = 250
"#
        )
        .unwrap();

        let config = FocusConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.detection.tick_interval_ms, 250);
        assert!(config.models.scenario_path.is_none());
        assert_eq!(config.system.event_bus_capacity, 100);
        assert_eq!(config.camera.backend, CameraBackend::Synthetic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_without_models_table() {
        let config: FocusConfig = toml::from_str("[camera]\nfps = 10\n").unwrap();

        assert_eq!(config.camera.fps, 10);
        assert!(config.models.scenario_path.is_none());
        assert_eq!(config.thresholds.no_face_ticks, 5);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FocusConfig::default();
        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());

        config.camera.resolution = (640, 480);
        assert!(config.validate().is_ok());

        config.detection.tick_interval_ms = 0;
        assert!(config.validate().is_err());
        config.detection.tick_interval_ms = 500;

        config.thresholds.looking_away_ticks = 0;
        assert!(config.validate().is_err());
        config.thresholds.looking_away_ticks = 3;

        config.thresholds.gaze_deviation_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
