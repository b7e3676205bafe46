use crate::classifier::{ObjectSignal, ObjectSignals};
use crate::hysteresis::{FaceSignal, HysteresisEngine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which distraction, if any, the engine currently reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionKind {
    None,
    Phone,
    Pet,
    MultiplePeople,
    NoFace,
    LookingAway,
    EyesClosed,
}

impl DistractionKind {
    pub fn is_distracted(&self) -> bool {
        !matches!(self, DistractionKind::None)
    }

    /// Banner text shown by the host
    pub fn message(&self) -> &'static str {
        match self {
            DistractionKind::None => "",
            DistractionKind::Phone => "Phone spotted. Put it away and get back to it!",
            DistractionKind::Pet => "A furry friend wants attention. Focus first, cuddles later.",
            DistractionKind::MultiplePeople => "Someone else is here. Keep the chat short.",
            DistractionKind::NoFace => "You left the frame. Come back to your task.",
            DistractionKind::LookingAway => "Eyes on your work, you are looking away.",
            DistractionKind::EyesClosed => "Your eyes are closed. Time for a short break?",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistractionKind::None => "none",
            DistractionKind::Phone => "phone",
            DistractionKind::Pet => "pet",
            DistractionKind::MultiplePeople => "multiple_people",
            DistractionKind::NoFace => "no_face",
            DistractionKind::LookingAway => "looking_away",
            DistractionKind::EyesClosed => "eyes_closed",
        }
    }
}

impl fmt::Display for DistractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ObjectSignal> for DistractionKind {
    fn from(signal: ObjectSignal) -> Self {
        match signal {
            ObjectSignal::HandheldDevice => DistractionKind::Phone,
            ObjectSignal::Animal => DistractionKind::Pet,
            ObjectSignal::ExtraPerson => DistractionKind::MultiplePeople,
        }
    }
}

impl From<FaceSignal> for DistractionKind {
    fn from(signal: FaceSignal) -> Self {
        match signal {
            FaceSignal::NoFace => DistractionKind::NoFace,
            FaceSignal::LookingAway => DistractionKind::LookingAway,
            FaceSignal::EyesClosed => DistractionKind::EyesClosed,
        }
    }
}

/// The value handed to the host whenever the distraction kind changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionVerdict {
    pub distracted: bool,
    pub kind: DistractionKind,
    pub message: String,
}

impl DistractionVerdict {
    pub fn none() -> Self {
        Self::from_kind(DistractionKind::None)
    }

    pub fn from_kind(kind: DistractionKind) -> Self {
        Self {
            distracted: kind.is_distracted(),
            kind,
            message: kind.message().to_string(),
        }
    }
}

impl Default for DistractionVerdict {
    fn default() -> Self {
        Self::none()
    }
}

/// Face signals in the order they win a conflict
const FACE_PRECEDENCE: [FaceSignal; 3] = [
    FaceSignal::LookingAway,
    FaceSignal::EyesClosed,
    FaceSignal::NoFace,
];

/// Resolve the single active kind from the latest object tick and the
/// debounced face signals. Object signals always outrank face signals.
pub fn resolve(objects: &ObjectSignals, hysteresis: &HysteresisEngine) -> DistractionKind {
    if let Some(signal) = objects.strongest() {
        return signal.into();
    }

    FACE_PRECEDENCE
        .iter()
        .copied()
        .find(|signal| hysteresis.is_at_threshold(*signal))
        .map(DistractionKind::from)
        .unwrap_or(DistractionKind::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saturate(engine: &mut HysteresisEngine, signal: FaceSignal) {
        for _ in 0..10 {
            engine.update(signal, true);
        }
    }

    #[test]
    fn test_none_verdict() {
        let verdict = DistractionVerdict::none();
        assert!(!verdict.distracted);
        assert_eq!(verdict.kind, DistractionKind::None);
        assert!(verdict.message.is_empty());
    }

    #[test]
    fn test_distracted_verdict_has_message() {
        let verdict = DistractionVerdict::from_kind(DistractionKind::Pet);
        assert!(verdict.distracted);
        assert!(!verdict.message.is_empty());
    }

    #[test]
    fn test_nothing_at_threshold_resolves_to_none() {
        let mut engine = HysteresisEngine::default();
        engine.update(FaceSignal::LookingAway, true);
        engine.update(FaceSignal::NoFace, true);

        assert_eq!(
            resolve(&ObjectSignals::default(), &engine),
            DistractionKind::None
        );
    }

    #[test]
    fn test_object_signals_outrank_face_signals() {
        let mut engine = HysteresisEngine::default();
        saturate(&mut engine, FaceSignal::LookingAway);

        let objects = ObjectSignals {
            handheld_device: true,
            ..ObjectSignals::default()
        };
        assert_eq!(resolve(&objects, &engine), DistractionKind::Phone);

        let objects = ObjectSignals {
            animal: true,
            extra_person: true,
            person_count: 2,
            ..ObjectSignals::default()
        };
        assert_eq!(resolve(&objects, &engine), DistractionKind::Pet);
    }

    #[test]
    fn test_face_precedence() {
        let mut engine = HysteresisEngine::default();
        saturate(&mut engine, FaceSignal::NoFace);
        assert_eq!(
            resolve(&ObjectSignals::default(), &engine),
            DistractionKind::NoFace
        );

        saturate(&mut engine, FaceSignal::EyesClosed);
        assert_eq!(
            resolve(&ObjectSignals::default(), &engine),
            DistractionKind::EyesClosed
        );

        saturate(&mut engine, FaceSignal::LookingAway);
        assert_eq!(
            resolve(&ObjectSignals::default(), &engine),
            DistractionKind::LookingAway
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DistractionKind::MultiplePeople).unwrap();
        assert_eq!(json, "\"multiple_people\"");
    }
}
