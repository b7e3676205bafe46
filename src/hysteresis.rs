//! Consecutive-hit debouncing for the face signal family.
//!
//! Each signal owns a counter that grows by one on every positive tick and
//! drops straight back to zero on the first negative tick. A signal is
//! considered active only once its counter has reached the configured
//! threshold, which keeps single noisy frames from flipping the verdict.

use crate::config::ThresholdConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Face-derived signals that are debounced before they can raise a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceSignal {
    NoFace,
    LookingAway,
    EyesClosed,
}

impl FaceSignal {
    pub const ALL: [FaceSignal; 3] = [
        FaceSignal::NoFace,
        FaceSignal::LookingAway,
        FaceSignal::EyesClosed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceSignal::NoFace => "no_face",
            FaceSignal::LookingAway => "looking_away",
            FaceSignal::EyesClosed => "eyes_closed",
        }
    }
}

impl fmt::Display for FaceSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debounce state of a single signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalState {
    BelowThreshold,
    AtThreshold,
}

/// Current consecutive-positive-tick counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounters {
    pub no_face: u32,
    pub looking_away: u32,
    pub eyes_closed: u32,
}

impl SignalCounters {
    pub fn get(&self, signal: FaceSignal) -> u32 {
        match signal {
            FaceSignal::NoFace => self.no_face,
            FaceSignal::LookingAway => self.looking_away,
            FaceSignal::EyesClosed => self.eyes_closed,
        }
    }

    fn slot(&mut self, signal: FaceSignal) -> &mut u32 {
        match signal {
            FaceSignal::NoFace => &mut self.no_face,
            FaceSignal::LookingAway => &mut self.looking_away,
            FaceSignal::EyesClosed => &mut self.eyes_closed,
        }
    }
}

/// Ticks required before each signal is at threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub no_face: u32,
    pub looking_away: u32,
    pub eyes_closed: u32,
}

impl SignalThresholds {
    pub fn get(&self, signal: FaceSignal) -> u32 {
        match signal {
            FaceSignal::NoFace => self.no_face,
            FaceSignal::LookingAway => self.looking_away,
            FaceSignal::EyesClosed => self.eyes_closed,
        }
    }
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            no_face: 5,
            looking_away: 3,
            eyes_closed: 5,
        }
    }
}

impl From<&ThresholdConfig> for SignalThresholds {
    fn from(config: &ThresholdConfig) -> Self {
        Self {
            no_face: config.no_face_ticks,
            looking_away: config.looking_away_ticks,
            eyes_closed: config.eyes_closed_ticks,
        }
    }
}

/// Converts raw per-tick booleans into threshold-gated signal states
#[derive(Debug, Clone, Default)]
pub struct HysteresisEngine {
    thresholds: SignalThresholds,
    counters: SignalCounters,
}

impl HysteresisEngine {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self {
            thresholds,
            counters: SignalCounters::default(),
        }
    }

    /// Record one tick for `signal` and report whether it is now at threshold
    pub fn update(&mut self, signal: FaceSignal, positive: bool) -> bool {
        let slot = self.counters.slot(signal);
        if positive {
            *slot = slot.saturating_add(1);
        } else {
            *slot = 0;
        }
        self.is_at_threshold(signal)
    }

    pub fn reset(&mut self, signal: FaceSignal) {
        *self.counters.slot(signal) = 0;
    }

    pub fn reset_all(&mut self) {
        self.counters = SignalCounters::default();
    }

    pub fn count(&self, signal: FaceSignal) -> u32 {
        self.counters.get(signal)
    }

    pub fn is_at_threshold(&self, signal: FaceSignal) -> bool {
        self.counters.get(signal) >= self.thresholds.get(signal)
    }

    pub fn state(&self, signal: FaceSignal) -> SignalState {
        if self.is_at_threshold(signal) {
            SignalState::AtThreshold
        } else {
            SignalState::BelowThreshold
        }
    }

    pub fn counters(&self) -> SignalCounters {
        self.counters
    }

    pub fn thresholds(&self) -> SignalThresholds {
        self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_face_reaches_threshold_on_fifth_tick() {
        let mut engine = HysteresisEngine::default();

        for _ in 0..4 {
            assert!(!engine.update(FaceSignal::NoFace, true));
        }
        assert_eq!(engine.state(FaceSignal::NoFace), SignalState::BelowThreshold);

        assert!(engine.update(FaceSignal::NoFace, true));
        assert_eq!(engine.state(FaceSignal::NoFace), SignalState::AtThreshold);
    }

    #[test]
    fn test_negative_tick_resets_without_decay() {
        let mut engine = HysteresisEngine::default();

        engine.update(FaceSignal::LookingAway, true);
        engine.update(FaceSignal::LookingAway, true);
        assert_eq!(engine.count(FaceSignal::LookingAway), 2);

        assert!(!engine.update(FaceSignal::LookingAway, false));
        assert_eq!(engine.count(FaceSignal::LookingAway), 0);

        engine.update(FaceSignal::LookingAway, true);
        engine.update(FaceSignal::LookingAway, true);
        assert!(engine.update(FaceSignal::LookingAway, true));
    }

    #[test]
    fn test_signals_are_independent() {
        let mut engine = HysteresisEngine::default();

        engine.update(FaceSignal::EyesClosed, true);
        engine.update(FaceSignal::LookingAway, true);
        engine.update(FaceSignal::EyesClosed, false);

        assert_eq!(engine.count(FaceSignal::EyesClosed), 0);
        assert_eq!(engine.count(FaceSignal::LookingAway), 1);
    }

    #[test]
    fn test_reset_and_reset_all() {
        let mut engine = HysteresisEngine::default();
        for signal in FaceSignal::ALL {
            for _ in 0..6 {
                engine.update(signal, true);
            }
        }

        engine.reset(FaceSignal::EyesClosed);
        assert_eq!(engine.count(FaceSignal::EyesClosed), 0);
        assert!(engine.is_at_threshold(FaceSignal::NoFace));

        engine.reset_all();
        assert_eq!(engine.counters(), SignalCounters::default());
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = ThresholdConfig {
            looking_away_ticks: 2,
            ..ThresholdConfig::default()
        };
        let mut engine = HysteresisEngine::new(SignalThresholds::from(&config));

        engine.update(FaceSignal::LookingAway, true);
        assert!(engine.update(FaceSignal::LookingAway, true));
    }

    proptest! {
        #[test]
        fn counter_tracks_trailing_positive_run(ticks in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut engine = HysteresisEngine::default();
            let mut run = 0u32;

            for positive in ticks {
                let at_threshold = engine.update(FaceSignal::LookingAway, positive);
                run = if positive { run + 1 } else { 0 };

                prop_assert_eq!(engine.count(FaceSignal::LookingAway), run);
                prop_assert_eq!(at_threshold, run >= 3);
            }
        }
    }
}
