use crate::config::ThresholdConfig;
use crate::error::Result;
use crate::frame::FrameData;
use crate::models::ObjectBackend;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One labelled detection as reported by the object backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPrediction {
    /// Class label, e.g. "cell phone", "dog", "person"
    pub label: String,
    /// Detection score in 0..=1
    pub score: f32,
    /// Optional bounding box as [x, y, width, height]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
}

impl ObjectPrediction {
    pub fn new<S: Into<String>>(label: S, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
            bbox: None,
        }
    }
}

/// Object-family signal, listed in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectSignal {
    HandheldDevice,
    Animal,
    ExtraPerson,
}

/// Result of one object tick. Stateless: nothing carries over between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSignals {
    pub handheld_device: bool,
    pub animal: bool,
    pub extra_person: bool,
    pub person_count: u32,
}

impl ObjectSignals {
    pub fn any(&self) -> bool {
        self.handheld_device || self.animal || self.extra_person
    }

    /// Highest-precedence signal that fired on this tick
    pub fn strongest(&self) -> Option<ObjectSignal> {
        if self.handheld_device {
            Some(ObjectSignal::HandheldDevice)
        } else if self.animal {
            Some(ObjectSignal::Animal)
        } else if self.extra_person {
            Some(ObjectSignal::ExtraPerson)
        } else {
            None
        }
    }

    pub fn labels(&self) -> Vec<ObjectSignal> {
        let mut labels = Vec::new();
        if self.handheld_device {
            labels.push(ObjectSignal::HandheldDevice);
        }
        if self.animal {
            labels.push(ObjectSignal::Animal);
        }
        if self.extra_person {
            labels.push(ObjectSignal::ExtraPerson);
        }
        labels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Phone,
    Animal,
    Person,
    Other,
}

fn categorize(label: &str) -> Category {
    match label.trim().to_ascii_lowercase().as_str() {
        "cell phone" | "cellphone" | "mobile phone" | "phone" => Category::Phone,
        "cat" | "dog" => Category::Animal,
        "person" => Category::Person,
        _ => Category::Other,
    }
}

/// Reduces raw object predictions to the distraction-relevant signals
#[derive(Debug, Clone)]
pub struct ObjectSignalClassifier {
    min_confidence: f32,
    tolerated_people: u32,
}

impl ObjectSignalClassifier {
    pub fn new(min_confidence: f32, tolerated_people: u32) -> Self {
        Self {
            min_confidence,
            tolerated_people,
        }
    }

    pub fn from_config(config: &ThresholdConfig) -> Self {
        Self::new(config.min_object_confidence, config.extra_person_count)
    }

    /// Run the backend on one frame and classify its output
    pub async fn classify(
        &self,
        backend: &dyn ObjectBackend,
        frame: &FrameData,
    ) -> Result<ObjectSignals> {
        let predictions = backend.detect(frame).await?;
        let signals = self.evaluate(&predictions);
        trace!(
            "Object tick on frame {}: {} predictions -> {:?}",
            frame.id,
            predictions.len(),
            signals
        );
        Ok(signals)
    }

    pub fn evaluate(&self, predictions: &[ObjectPrediction]) -> ObjectSignals {
        let mut signals = ObjectSignals::default();

        for prediction in predictions.iter().filter(|p| p.score >= self.min_confidence) {
            match categorize(&prediction.label) {
                Category::Phone => signals.handheld_device = true,
                Category::Animal => signals.animal = true,
                Category::Person => signals.person_count += 1,
                Category::Other => {}
            }
        }

        signals.extra_person = signals.person_count > self.tolerated_people;
        signals
    }
}

impl Default for ObjectSignalClassifier {
    fn default() -> Self {
        Self::from_config(&ThresholdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_detection() {
        let classifier = ObjectSignalClassifier::default();
        let signals = classifier.evaluate(&[
            ObjectPrediction::new("person", 0.9),
            ObjectPrediction::new("Cell Phone", 0.8),
        ]);

        assert!(signals.handheld_device);
        assert!(!signals.extra_person);
        assert_eq!(signals.strongest(), Some(ObjectSignal::HandheldDevice));
    }

    #[test]
    fn test_low_confidence_predictions_ignored() {
        let classifier = ObjectSignalClassifier::default();
        let signals = classifier.evaluate(&[ObjectPrediction::new("cell phone", 0.3)]);

        assert!(!signals.any());
    }

    #[test]
    fn test_pets_and_people() {
        let classifier = ObjectSignalClassifier::default();

        let signals = classifier.evaluate(&[ObjectPrediction::new("dog", 0.7)]);
        assert_eq!(signals.strongest(), Some(ObjectSignal::Animal));

        let signals = classifier.evaluate(&[ObjectPrediction::new("person", 0.9)]);
        assert_eq!(signals.person_count, 1);
        assert!(!signals.extra_person);

        let signals = classifier.evaluate(&[
            ObjectPrediction::new("person", 0.9),
            ObjectPrediction::new("person", 0.6),
            ObjectPrediction::new("cat", 0.6),
        ]);
        assert_eq!(signals.person_count, 2);
        assert!(signals.extra_person);
        assert_eq!(
            signals.labels(),
            vec![ObjectSignal::Animal, ObjectSignal::ExtraPerson]
        );
        assert_eq!(signals.strongest(), Some(ObjectSignal::Animal));
    }

    #[test]
    fn test_unrelated_objects() {
        let classifier = ObjectSignalClassifier::default();
        let signals = classifier.evaluate(&[
            ObjectPrediction::new("laptop", 0.95),
            ObjectPrediction::new("cup", 0.8),
        ]);

        assert_eq!(signals, ObjectSignals::default());
        assert_eq!(signals.strongest(), None);
    }
}
