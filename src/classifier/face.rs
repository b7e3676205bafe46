use crate::config::ThresholdConfig;
use crate::error::{FocusError, Result};
use crate::frame::FrameData;
use crate::models::{ClassifierFamily, FaceBackend};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::trace;

/// Number of points in the facial landmark layout
pub const LANDMARK_COUNT: usize = 68;

const JAW: Range<usize> = 0..17;
const NOSE: Range<usize> = 27..36;
const LEFT_EYE: Range<usize> = 36..42;
const RIGHT_EYE: Range<usize> = 42..48;

/// Index of the lower nose tip within the nose contour
const NOSE_TIP: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 68-point facial landmark set in frame pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        Self::try_from(points).map_err(|e| FocusError::inference(ClassifierFamily::Face, e))
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn jaw_outline(&self) -> &[Point] {
        &self.points[JAW]
    }

    pub fn nose(&self) -> &[Point] {
        &self.points[NOSE]
    }

    pub fn left_eye(&self) -> &[Point] {
        &self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> &[Point] {
        &self.points[RIGHT_EYE]
    }
}

impl TryFrom<Vec<Point>> for FaceLandmarks {
    type Error = String;

    fn try_from(points: Vec<Point>) -> std::result::Result<Self, Self::Error> {
        if points.len() != LANDMARK_COUNT {
            return Err(format!(
                "expected {} landmarks, got {}",
                LANDMARK_COUNT,
                points.len()
            ));
        }
        Ok(Self { points })
    }
}

impl From<FaceLandmarks> for Vec<Point> {
    fn from(landmarks: FaceLandmarks) -> Self {
        landmarks.points
    }
}

/// Expression scores reported alongside the landmarks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expressions {
    pub neutral: f32,
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub fearful: f32,
    pub disgusted: f32,
    pub surprised: f32,
}

/// One face as reported by the face backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub landmarks: FaceLandmarks,
    #[serde(default)]
    pub expressions: Expressions,
    #[serde(default = "default_detection_score")]
    pub score: f32,
}

fn default_detection_score() -> f32 {
    1.0
}

/// Result of one face tick.
///
/// `looking_away` and `eyes_closed` are only defined when a face was found.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceObservation {
    pub face_found: bool,
    pub landmarks: Option<FaceLandmarks>,
    pub looking_away: Option<bool>,
    pub eyes_closed: Option<bool>,
}

impl FaceObservation {
    pub fn absent() -> Self {
        Self {
            face_found: false,
            landmarks: None,
            looking_away: None,
            eyes_closed: None,
        }
    }
}

/// Landmark geometry for gaze deviation and eye closure
#[derive(Debug, Clone)]
pub struct FaceSignalClassifier {
    gaze_deviation_ratio: f32,
    eye_closed_ratio: f32,
    happy_eyes_closed_score: f32,
}

impl FaceSignalClassifier {
    pub fn new(gaze_deviation_ratio: f32, eye_closed_ratio: f32, happy_eyes_closed_score: f32) -> Self {
        Self {
            gaze_deviation_ratio,
            eye_closed_ratio,
            happy_eyes_closed_score,
        }
    }

    pub fn from_config(config: &ThresholdConfig) -> Self {
        Self::new(
            config.gaze_deviation_ratio,
            config.eye_closed_ratio,
            config.happy_eyes_closed_score,
        )
    }

    /// Run the backend on one frame.
    ///
    /// Returns `Ok(None)` when the frame has no usable dimensions yet; such a
    /// tick must leave every counter untouched.
    pub async fn classify(
        &self,
        backend: &dyn FaceBackend,
        frame: &FrameData,
    ) -> Result<Option<FaceObservation>> {
        if !frame.has_dimensions() {
            trace!("Frame {} has no dimensions yet, skipping face tick", frame.id);
            return Ok(None);
        }

        let detections = backend.detect(frame).await?;
        Ok(Some(self.observe(detections.into_iter().next())))
    }

    /// Derive the per-tick face booleans from the first detected face
    pub fn observe(&self, detection: Option<FaceDetection>) -> FaceObservation {
        match detection {
            None => FaceObservation::absent(),
            Some(face) => {
                let looking_away = self.is_looking_away(&face.landmarks);
                let eyes_closed = self.are_eyes_closed(&face);
                FaceObservation {
                    face_found: true,
                    landmarks: Some(face.landmarks),
                    looking_away: Some(looking_away),
                    eyes_closed: Some(eyes_closed),
                }
            }
        }
    }

    /// Nose tip deviating from the jaw midline by more than the configured
    /// share of the face width.
    pub fn is_looking_away(&self, landmarks: &FaceLandmarks) -> bool {
        let jaw = landmarks.jaw_outline();
        let jaw_left = jaw[0];
        let jaw_right = jaw[jaw.len() - 1];
        let nose_tip = landmarks.nose()[NOSE_TIP];

        let face_width = jaw_right.x - jaw_left.x;
        let deviation = (nose_tip.x - (jaw_left.x + face_width / 2.0)).abs();

        deviation > face_width * self.gaze_deviation_ratio
    }

    /// Either eye below the openness ratio, or a smile broad enough to squint
    pub fn are_eyes_closed(&self, face: &FaceDetection) -> bool {
        if face.expressions.happy > self.happy_eyes_closed_score {
            return true;
        }

        let closed = |eye: &[Point]| {
            eye_openness(eye)
                .map(|ratio| ratio < self.eye_closed_ratio)
                .unwrap_or(false)
        };

        closed(face.landmarks.left_eye()) || closed(face.landmarks.right_eye())
    }
}

impl Default for FaceSignalClassifier {
    fn default() -> Self {
        Self::from_config(&ThresholdConfig::default())
    }
}

/// Lid separation over corner-to-corner width for a six-point eye contour.
///
/// Points 1 and 2 are the upper lid, 4 and 5 the lower lid, 0 and 3 the
/// corners. Image y grows downwards so an open eye yields a positive ratio.
pub fn eye_openness(eye: &[Point]) -> Option<f32> {
    if eye.len() != 6 {
        return None;
    }

    let top = (eye[1].y + eye[2].y) / 2.0;
    let bottom = (eye[4].y + eye[5].y) / 2.0;
    let width = eye[3].x - eye[0].x;

    if width.abs() <= f32::EPSILON {
        return None;
    }

    Some((bottom - top) / width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye(corner_x: f32, y: f32, height: f32) -> [Point; 6] {
        [
            Point::new(corner_x, y),
            Point::new(corner_x + 5.0, y - height / 2.0),
            Point::new(corner_x + 15.0, y - height / 2.0),
            Point::new(corner_x + 20.0, y),
            Point::new(corner_x + 15.0, y + height / 2.0),
            Point::new(corner_x + 5.0, y + height / 2.0),
        ]
    }

    /// Face spanning x = 100..200 with the nose tip at `nose_x`
    fn face(nose_x: f32, left_eye_height: f32, right_eye_height: f32) -> FaceLandmarks {
        let mut points = vec![Point::default(); LANDMARK_COUNT];
        for (i, p) in points[JAW].iter_mut().enumerate() {
            *p = Point::new(100.0 + i as f32 * 6.25, 150.0);
        }
        for p in points[NOSE].iter_mut() {
            *p = Point::new(nose_x, 120.0);
        }
        points[LEFT_EYE].copy_from_slice(&eye(115.0, 100.0, left_eye_height));
        points[RIGHT_EYE].copy_from_slice(&eye(165.0, 100.0, right_eye_height));
        FaceLandmarks::new(points).unwrap()
    }

    fn detection(landmarks: FaceLandmarks, happy: f32) -> FaceDetection {
        FaceDetection {
            landmarks,
            expressions: Expressions {
                happy,
                ..Expressions::default()
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_landmark_count_is_enforced() {
        assert!(FaceLandmarks::new(vec![Point::default(); 10]).is_err());
        assert!(FaceLandmarks::new(vec![Point::default(); LANDMARK_COUNT]).is_ok());
    }

    #[test]
    fn test_centered_face_is_not_looking_away() {
        let classifier = FaceSignalClassifier::default();
        assert!(!classifier.is_looking_away(&face(150.0, 8.0, 8.0)));
        // 19% of the width is still inside the band
        assert!(!classifier.is_looking_away(&face(169.0, 8.0, 8.0)));
    }

    #[test]
    fn test_turned_face_is_looking_away() {
        let classifier = FaceSignalClassifier::default();
        assert!(classifier.is_looking_away(&face(175.0, 8.0, 8.0)));
        assert!(classifier.is_looking_away(&face(125.0, 8.0, 8.0)));
    }

    #[test]
    fn test_eye_openness_ratio() {
        let open = eye(0.0, 50.0, 8.0);
        let ratio = eye_openness(&open).unwrap();
        assert!((ratio - 0.4).abs() < 1e-6);

        let degenerate = [Point::new(3.0, 3.0); 6];
        assert_eq!(eye_openness(&degenerate), None);
    }

    #[test]
    fn test_eyes_closed_when_either_eye_closed() {
        let classifier = FaceSignalClassifier::default();

        assert!(!classifier.are_eyes_closed(&detection(face(150.0, 8.0, 8.0), 0.0)));
        assert!(classifier.are_eyes_closed(&detection(face(150.0, 2.0, 8.0), 0.0)));
        assert!(classifier.are_eyes_closed(&detection(face(150.0, 8.0, 5.0), 0.0)));
    }

    #[test]
    fn test_broad_smile_counts_as_eyes_closed() {
        let classifier = FaceSignalClassifier::default();

        assert!(classifier.are_eyes_closed(&detection(face(150.0, 8.0, 8.0), 0.95)));
        assert!(!classifier.are_eyes_closed(&detection(face(150.0, 8.0, 8.0), 0.9)));
    }

    #[test]
    fn test_observe_without_face() {
        let classifier = FaceSignalClassifier::default();
        let observation = classifier.observe(None);

        assert!(!observation.face_found);
        assert_eq!(observation.looking_away, None);
        assert_eq!(observation.eyes_closed, None);
    }

    #[test]
    fn test_observe_with_face() {
        let classifier = FaceSignalClassifier::default();
        let observation = classifier.observe(Some(detection(face(180.0, 2.0, 2.0), 0.0)));

        assert!(observation.face_found);
        assert_eq!(observation.looking_away, Some(true));
        assert_eq!(observation.eyes_closed, Some(true));
        assert!(observation.landmarks.is_some());
    }

    #[test]
    fn test_landmarks_deserialize_checks_length() {
        let short = serde_json::json!([{ "x": 1.0, "y": 2.0 }]);
        assert!(serde_json::from_value::<FaceLandmarks>(short).is_err());
    }
}
