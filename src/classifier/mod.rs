//! Per-frame signal extraction for both classifier families.
//!
//! The classifiers here are thin, deterministic layers over the opaque model
//! backends: they call a backend for one frame and reduce its raw output to
//! the handful of booleans the hysteresis engine and verdict resolution need.

mod face;
mod object;

pub use face::{
    eye_openness, Expressions, FaceDetection, FaceLandmarks, FaceObservation,
    FaceSignalClassifier, Point, LANDMARK_COUNT,
};
pub use object::{ObjectPrediction, ObjectSignal, ObjectSignalClassifier, ObjectSignals};
