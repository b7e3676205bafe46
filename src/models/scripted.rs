//! Deterministic classifier backends driven by a JSON scenario.
//!
//! A scenario lists what each family "sees" tick by tick. The demo binary
//! uses it in place of real inference so the whole pipeline can run on a
//! machine without model weights or a camera.

use super::{ClassifierFamily, FaceBackend, ModelLoader, ObjectBackend};
use crate::classifier::{
    Expressions, FaceDetection, FaceLandmarks, ObjectPrediction, Point, LANDMARK_COUNT,
};
use crate::error::{FocusError, ModelError, Result};
use crate::frame::FrameData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What the object backend reports on one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectScript {
    pub detections: Vec<ObjectPrediction>,
    /// Fail this tick with an inference error
    pub error: Option<String>,
}

impl ObjectScript {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(labels: &[(&str, f32)]) -> Self {
        Self {
            detections: labels
                .iter()
                .map(|(label, score)| ObjectPrediction::new(*label, *score))
                .collect(),
            error: None,
        }
    }
}

/// What the face backend reports on one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceScript {
    /// Whether a face is in frame at all
    pub present: bool,
    /// Horizontal nose offset from the jaw midline, as a fraction of face width
    pub nose_offset: f32,
    /// Eye height over width for both eyes
    pub eye_ratio: f32,
    /// "happy" expression score
    pub happy: f32,
    /// Explicit landmarks, overriding the synthetic face
    pub landmarks: Option<FaceLandmarks>,
    /// Fail this tick with an inference error
    pub error: Option<String>,
}

impl Default for FaceScript {
    fn default() -> Self {
        Self {
            present: true,
            nose_offset: 0.0,
            eye_ratio: 0.35,
            happy: 0.0,
            landmarks: None,
            error: None,
        }
    }
}

impl FaceScript {
    pub fn attentive() -> Self {
        Self::default()
    }

    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::default()
        }
    }

    pub fn looking_away() -> Self {
        Self {
            nose_offset: 0.3,
            ..Self::default()
        }
    }

    pub fn eyes_closed() -> Self {
        Self {
            eye_ratio: 0.1,
            ..Self::default()
        }
    }
}

/// Tick-by-tick script for both classifier families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub object_ticks: Vec<ObjectScript>,
    pub face_ticks: Vec<FaceScript>,
    /// Start over once a script runs out; otherwise the last entry repeats
    #[serde(rename = "loop")]
    pub repeat: bool,
    /// Simulated model load time
    pub load_delay_ms: u64,
    /// Simulated inference time per call
    pub inference_latency_ms: u64,
    /// Make the object model fail to load with this message
    pub fail_object_load: Option<String>,
    /// Make the face model fail to load with this message
    pub fail_face_load: Option<String>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            object_ticks: Vec::new(),
            face_ticks: Vec::new(),
            repeat: true,
            load_delay_ms: 0,
            inference_latency_ms: 0,
            fail_object_load: None,
            fail_face_load: None,
        }
    }
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading scenario from: {}", path.display());

        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&contents)?;

        info!(
            "Loaded scenario with {} object ticks and {} face ticks",
            scenario.object_ticks.len(),
            scenario.face_ticks.len()
        );
        Ok(scenario)
    }

    /// Built-in loop that walks through every kind of distraction
    pub fn demo() -> Self {
        let mut face_ticks = Vec::new();
        face_ticks.extend(std::iter::repeat(FaceScript::attentive()).take(10));
        face_ticks.extend(std::iter::repeat(FaceScript::looking_away()).take(6));
        face_ticks.extend(std::iter::repeat(FaceScript::attentive()).take(4));
        face_ticks.extend(std::iter::repeat(FaceScript::eyes_closed()).take(8));
        face_ticks.extend(std::iter::repeat(FaceScript::attentive()).take(4));
        face_ticks.extend(std::iter::repeat(FaceScript::absent()).take(8));
        face_ticks.extend(std::iter::repeat(FaceScript::attentive()).take(20));

        let mut object_ticks = Vec::new();
        object_ticks.extend(std::iter::repeat(ObjectScript::empty()).take(42));
        object_ticks.extend(std::iter::repeat(ObjectScript::with(&[("cell phone", 0.87)])).take(6));
        object_ticks.extend(std::iter::repeat(ObjectScript::empty()).take(4));
        object_ticks.extend(std::iter::repeat(ObjectScript::with(&[("dog", 0.74)])).take(4));
        object_ticks.extend(
            std::iter::repeat(ObjectScript::with(&[("person", 0.93), ("person", 0.81)])).take(4),
        );

        Self {
            object_ticks,
            face_ticks,
            load_delay_ms: 300,
            ..Self::default()
        }
    }
}

/// Next entry of a script, advancing the shared cursor
fn next_entry<'a, T>(script: &'a [T], cursor: &AtomicUsize, repeat: bool) -> Option<&'a T> {
    let index = cursor.fetch_add(1, Ordering::SeqCst);
    if script.is_empty() {
        None
    } else if repeat {
        script.get(index % script.len())
    } else {
        script.get(index.min(script.len() - 1))
    }
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

pub struct ScriptedObjectBackend {
    script: Vec<ObjectScript>,
    repeat: bool,
    latency: Duration,
    cursor: AtomicUsize,
}

impl ScriptedObjectBackend {
    pub fn new(script: Vec<ObjectScript>, repeat: bool, latency: Duration) -> Self {
        Self {
            script,
            repeat,
            latency,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of detect calls served so far
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectBackend for ScriptedObjectBackend {
    async fn detect(&self, _frame: &FrameData) -> Result<Vec<ObjectPrediction>> {
        simulate_latency(self.latency).await;

        match next_entry(&self.script, &self.cursor, self.repeat) {
            None => Ok(Vec::new()),
            Some(ObjectScript {
                error: Some(details),
                ..
            }) => Err(FocusError::inference(ClassifierFamily::Object, details.clone())),
            Some(entry) => Ok(entry.detections.clone()),
        }
    }
}

pub struct ScriptedFaceBackend {
    script: Vec<FaceScript>,
    repeat: bool,
    latency: Duration,
    cursor: AtomicUsize,
}

impl ScriptedFaceBackend {
    pub fn new(script: Vec<FaceScript>, repeat: bool, latency: Duration) -> Self {
        Self {
            script,
            repeat,
            latency,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn render(entry: &FaceScript) -> Result<Vec<FaceDetection>> {
        if let Some(details) = &entry.error {
            return Err(FocusError::inference(ClassifierFamily::Face, details.clone()));
        }
        if !entry.present {
            return Ok(Vec::new());
        }

        let landmarks = match &entry.landmarks {
            Some(landmarks) => landmarks.clone(),
            None => synthetic_landmarks(entry.nose_offset, entry.eye_ratio)?,
        };

        Ok(vec![FaceDetection {
            landmarks,
            expressions: Expressions {
                neutral: (1.0 - entry.happy).max(0.0),
                happy: entry.happy,
                ..Expressions::default()
            },
            score: 0.95,
        }])
    }
}

#[async_trait]
impl FaceBackend for ScriptedFaceBackend {
    async fn detect(&self, _frame: &FrameData) -> Result<Vec<FaceDetection>> {
        simulate_latency(self.latency).await;

        match next_entry(&self.script, &self.cursor, self.repeat) {
            Some(entry) => Self::render(entry),
            None => Self::render(&FaceScript::attentive()),
        }
    }
}

/// Serves scripted backends for both families
pub struct ScenarioLoader {
    scenario: Scenario,
}

impl ScenarioLoader {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Scenario::from_file(path)?))
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn latency(&self) -> Duration {
        Duration::from_millis(self.scenario.inference_latency_ms)
    }

    async fn simulate_load(
        &self,
        family: ClassifierFamily,
        failure: &Option<String>,
    ) -> std::result::Result<(), ModelError> {
        simulate_latency(Duration::from_millis(self.scenario.load_delay_ms)).await;
        match failure {
            Some(details) => Err(ModelError::LoadFailed {
                family,
                details: details.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModelLoader for ScenarioLoader {
    async fn load_object(&self) -> std::result::Result<Arc<dyn ObjectBackend>, ModelError> {
        self.simulate_load(ClassifierFamily::Object, &self.scenario.fail_object_load)
            .await?;
        Ok(Arc::new(ScriptedObjectBackend::new(
            self.scenario.object_ticks.clone(),
            self.scenario.repeat,
            self.latency(),
        )))
    }

    async fn load_face(&self) -> std::result::Result<Arc<dyn FaceBackend>, ModelError> {
        self.simulate_load(ClassifierFamily::Face, &self.scenario.fail_face_load)
            .await?;
        Ok(Arc::new(ScriptedFaceBackend::new(
            self.scenario.face_ticks.clone(),
            self.scenario.repeat,
            self.latency(),
        )))
    }
}

/// Six-point eye contour with corner-to-corner width `width`
fn eye_contour(corner_x: f32, y: f32, width: f32, ratio: f32) -> [Point; 6] {
    let half = width * ratio / 2.0;
    [
        Point::new(corner_x, y),
        Point::new(corner_x + width * 0.3, y - half),
        Point::new(corner_x + width * 0.7, y - half),
        Point::new(corner_x + width, y),
        Point::new(corner_x + width * 0.7, y + half),
        Point::new(corner_x + width * 0.3, y + half),
    ]
}

/// Build a frontal 68-point face centred in a 640x480 frame.
///
/// `nose_offset` shifts the nose horizontally by that fraction of the face
/// width; `eye_ratio` sets the openness of both eyes.
pub fn synthetic_landmarks(nose_offset: f32, eye_ratio: f32) -> Result<FaceLandmarks> {
    const LEFT: f32 = 220.0;
    const WIDTH: f32 = 200.0;
    const EYE_WIDTH: f32 = 40.0;
    let center = LEFT + WIDTH / 2.0;

    let mut points = Vec::with_capacity(LANDMARK_COUNT);

    // Jaw 0..17, a shallow U from ear to ear
    for i in 0..17 {
        let t = i as f32 / 16.0;
        let sag = (t * std::f32::consts::PI).sin() * 120.0;
        points.push(Point::new(LEFT + WIDTH * t, 220.0 + sag));
    }

    // Brows 17..27
    for i in 0..5 {
        points.push(Point::new(LEFT + 25.0 + i as f32 * 12.0, 190.0));
    }
    for i in 0..5 {
        points.push(Point::new(center + 15.0 + i as f32 * 12.0, 190.0));
    }

    // Nose 27..36: bridge then the lower contour around the tip
    let nose_x = center + nose_offset * WIDTH;
    for i in 0..4 {
        points.push(Point::new(nose_x, 210.0 + i as f32 * 15.0));
    }
    for i in 0..5 {
        points.push(Point::new(nose_x + (i as f32 - 2.0) * 8.0, 265.0));
    }

    // Eyes 36..48
    points.extend_from_slice(&eye_contour(center - 20.0 - EYE_WIDTH, 215.0, EYE_WIDTH, eye_ratio));
    points.extend_from_slice(&eye_contour(center + 20.0, 215.0, EYE_WIDTH, eye_ratio));

    // Mouth 48..68
    for i in 0..12 {
        let angle = i as f32 / 12.0 * std::f32::consts::TAU;
        points.push(Point::new(center + angle.cos() * 30.0, 300.0 + angle.sin() * 12.0));
    }
    for i in 0..8 {
        let angle = i as f32 / 8.0 * std::f32::consts::TAU;
        points.push(Point::new(center + angle.cos() * 20.0, 300.0 + angle.sin() * 5.0));
    }

    FaceLandmarks::new(points)
}
