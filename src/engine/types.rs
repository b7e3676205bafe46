use crate::hysteresis::{SignalCounters, SignalThresholds};
use crate::models::ModelReadiness;
use crate::verdict::DistractionVerdict;
use serde::{Deserialize, Serialize};

/// Lifecycle states of the detection engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl EngineState {
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Starting | EngineState::Running)
    }
}

/// Point-in-time view of the engine for display purposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub session_id: Option<String>,
    pub verdict: DistractionVerdict,
    pub counters: SignalCounters,
    pub thresholds: SignalThresholds,
    /// Outcome of the latest face tick, `None` before the first one
    pub face_detected: Option<bool>,
    pub object_readiness: ModelReadiness,
    pub face_readiness: ModelReadiness,
}

/// Host callback receiving every change of the verdict kind.
///
/// Called synchronously and in order; implementations must not block.
pub trait VerdictListener: Send + Sync {
    fn on_verdict_change(&self, verdict: &DistractionVerdict);
}

impl<F> VerdictListener for F
where
    F: Fn(&DistractionVerdict) + Send + Sync,
{
    fn on_verdict_change(&self, verdict: &DistractionVerdict) {
        self(verdict)
    }
}
