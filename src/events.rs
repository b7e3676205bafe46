use crate::classifier::FaceLandmarks;
use crate::engine::EngineState;
use crate::error::EventBusError;
use crate::hysteresis::SignalCounters;
use crate::models::{ClassifierFamily, ModelReadiness};
use crate::verdict::DistractionVerdict;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// Display-side notifications published by the engine.
///
/// The verdict listener stays the authoritative contract; these events feed
/// status lines, overlays and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FocusEvent {
    /// The resolved distraction kind changed
    VerdictChanged {
        verdict: DistractionVerdict,
        timestamp: SystemTime,
    },
    /// The engine moved to a new lifecycle state
    EngineStateChanged {
        state: EngineState,
        session_id: Option<String>,
    },
    /// A classifier family finished (or failed) loading
    ModelReadinessChanged {
        family: ClassifierFamily,
        readiness: ModelReadiness,
    },
    /// Camera connection status changed
    CameraStatusChanged {
        connected: bool,
        timestamp: SystemTime,
    },
    /// Landmarks to draw over the video after a face tick
    FaceOverlay {
        frame_id: u64,
        landmarks: FaceLandmarks,
    },
    /// Any drawn overlay should be removed
    OverlayCleared,
    /// Face counters after a face tick
    CountersUpdated { counters: SignalCounters },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl FocusEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            FocusEvent::VerdictChanged { verdict, .. } => {
                format!("Verdict changed to {}", verdict.kind)
            }
            FocusEvent::EngineStateChanged { state, .. } => {
                format!("Engine state: {:?}", state)
            }
            FocusEvent::ModelReadinessChanged { family, readiness } => {
                format!("{} model: {:?}", family, readiness)
            }
            FocusEvent::CameraStatusChanged { connected, .. } => {
                format!(
                    "Camera {}",
                    if *connected {
                        "connected"
                    } else {
                        "disconnected"
                    }
                )
            }
            FocusEvent::FaceOverlay { frame_id, .. } => {
                format!("Face overlay for frame {}", frame_id)
            }
            FocusEvent::OverlayCleared => "Overlay cleared".to_string(),
            FocusEvent::CountersUpdated { counters } => format!(
                "Counters: no_face={} looking_away={} eyes_closed={}",
                counters.no_face, counters.looking_away, counters.eyes_closed
            ),
            FocusEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            FocusEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            FocusEvent::VerdictChanged { .. } => "verdict_changed",
            FocusEvent::EngineStateChanged { .. } => "engine_state_changed",
            FocusEvent::ModelReadinessChanged { .. } => "model_readiness_changed",
            FocusEvent::CameraStatusChanged { .. } => "camera_status_changed",
            FocusEvent::FaceOverlay { .. } => "face_overlay",
            FocusEvent::OverlayCleared => "overlay_cleared",
            FocusEvent::CountersUpdated { .. } => "counters_updated",
            FocusEvent::SystemError { .. } => "system_error",
            FocusEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<FocusEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied on receive
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.to_string())
    }

    /// Publish an event to all subscribers.
    ///
    /// Never blocks; callers holding engine state may publish under a lock.
    pub fn publish(&self, event: FocusEvent) -> Result<usize, EventBusError> {
        match &event {
            FocusEvent::VerdictChanged { verdict, .. } => {
                debug!("Verdict changed: {}", verdict.kind);
            }
            FocusEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            FocusEvent::CameraStatusChanged { connected, .. } => {
                if *connected {
                    info!("Camera connected");
                } else {
                    warn!("Camera disconnected");
                }
            }
            FocusEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            FocusEvent::FaceOverlay { .. } | FocusEvent::CountersUpdated { .. } => {
                trace!("Event: {}", event.description());
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish without caring whether anyone is listening
    pub fn emit(&self, event: FocusEvent) {
        if self.publish(event).is_err() {
            trace!("No subscribers for event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    /// SystemError events from specific components
    Components(Vec<String>),
    Custom(fn(&FocusEvent) -> bool),
}

impl EventFilter {
    pub fn matches(&self, event: &FocusEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Components(components) => {
                if let FocusEvent::SystemError { component, .. } = event {
                    components.contains(component)
                } else {
                    false
                }
            }
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<FocusEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<FocusEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next event passing the filter.
    ///
    /// Lagging is logged and skipped; only a closed bus ends the stream.
    pub async fn recv(&mut self) -> Result<FocusEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        trace!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<FocusEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::DistractionKind;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus
            .publish(FocusEvent::VerdictChanged {
                verdict: DistractionVerdict::from_kind(DistractionKind::Phone),
                timestamp: SystemTime::now(),
            })
            .unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            FocusEvent::VerdictChanged { verdict, .. } => {
                assert_eq!(verdict.kind, DistractionKind::Phone);
            }
            other => panic!("Unexpected event type: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);

        assert!(event_bus.publish(FocusEvent::OverlayCleared).is_err());
        // emit swallows the missing-subscriber error
        event_bus.emit(FocusEvent::OverlayCleared);
        assert!(!event_bus.has_subscribers());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(FocusEvent::OverlayCleared).unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::EventTypes(vec!["verdict_changed"]);

        assert!(filter.matches(&FocusEvent::VerdictChanged {
            verdict: DistractionVerdict::none(),
            timestamp: SystemTime::now(),
        }));
        assert!(!filter.matches(&FocusEvent::OverlayCleared));

        let components = EventFilter::Components(vec!["camera".to_string()]);
        assert!(components.matches(&FocusEvent::SystemError {
            component: "camera".to_string(),
            error: "stream lost".to_string(),
        }));
        assert!(!components.matches(&FocusEvent::OverlayCleared));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut receiver =
            event_bus.subscribe_filtered(EventFilter::EventTypes(vec!["counters_updated"]), "test");

        event_bus.publish(FocusEvent::OverlayCleared).unwrap();
        event_bus
            .publish(FocusEvent::CountersUpdated {
                counters: SignalCounters {
                    no_face: 2,
                    ..SignalCounters::default()
                },
            })
            .unwrap();

        match timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap()
        {
            FocusEvent::CountersUpdated { counters } => assert_eq!(counters.no_face, 2),
            other => panic!("Unexpected event type: {:?}", other),
        }
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lagged_receiver_keeps_going() {
        let event_bus = EventBus::new(2);
        let mut receiver = event_bus.subscribe_filtered(EventFilter::All, "slow");

        for _ in 0..5 {
            event_bus.publish(FocusEvent::OverlayCleared).unwrap();
        }

        assert!(receiver.recv().await.is_ok());
    }
}
