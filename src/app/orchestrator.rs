use super::alert::AlertPresenter;
use super::keyboard_input::KeyboardInputHandler;
use super::types::{AppCommand, ShutdownReason};
use crate::camera::{FrameSource, FrameSourceBuilder};
use crate::config::FocusConfig;
use crate::engine::DetectionEngine;
use crate::error::Result;
use crate::events::EventBus;
use crate::models::{ModelLoader, Scenario, ScenarioLoader};
use crate::verdict::DistractionVerdict;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

/// Host application: owns the engine and everything presenting it
pub struct FocusApp {
    pub(super) config: FocusConfig,
    pub(super) event_bus: EventBus,
    pub(super) engine: DetectionEngine,
    pub(super) alerts: Arc<AlertPresenter>,

    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) command_sender: mpsc::UnboundedSender<AppCommand>,
    pub(super) command_receiver: Option<mpsc::UnboundedReceiver<AppCommand>>,

    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl FocusApp {
    /// Wire the configured camera and model backends into a new engine
    pub async fn new(config: FocusConfig) -> Result<Self> {
        let loader: Arc<dyn ModelLoader> = match &config.models.scenario_path {
            Some(path) => {
                info!("Using scenario from {}", path);
                Arc::new(ScenarioLoader::from_file(path)?)
            }
            None => {
                info!("No scenario configured, using the built-in demo");
                Arc::new(ScenarioLoader::new(Scenario::demo()))
            }
        };

        let source = FrameSourceBuilder::new()
            .config(config.camera.clone())
            .build()?;

        Self::with_components(config, source, loader, AlertPresenter::new(true))
    }

    /// Assemble the application from already-built parts
    pub fn with_components(
        config: FocusConfig,
        source: Arc<dyn FrameSource>,
        loader: Arc<dyn ModelLoader>,
        alerts: AlertPresenter,
    ) -> Result<Self> {
        let capacity = config.system.event_bus_capacity;
        let event_bus = if tracing::enabled!(Level::DEBUG) {
            EventBus::with_debug_logging(capacity)
        } else {
            EventBus::new(capacity)
        };
        let alerts = Arc::new(alerts);

        let listener = Arc::clone(&alerts);
        let engine = DetectionEngine::builder()
            .config(config.clone())
            .frame_source(source)
            .model_loader(loader)
            .event_bus(event_bus.clone())
            .listener(move |verdict: &DistractionVerdict| listener.present(verdict))
            .build()?;

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let (command_sender, command_receiver) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            event_bus,
            engine,
            alerts,
            keyboard_handler: Some(KeyboardInputHandler::new(command_sender.clone())),
            keyboard_enabled: false,
            command_sender,
            command_receiver: Some(command_receiver),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Enable or disable the interactive keyboard controls
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    pub fn alerts(&self) -> &AlertPresenter {
        &self.alerts
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// Handle for issuing commands as if typed at the keyboard
    pub fn commands(&self) -> mpsc::UnboundedSender<AppCommand> {
        self.command_sender.clone()
    }
}
