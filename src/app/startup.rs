use super::FocusApp;
use crate::events::{EventFilter, FocusEvent};
use crate::error::Result;
use tracing::{debug, error, info, warn};

impl FocusApp {
    /// Start the background pieces and, when `autostart` is set, detection
    pub async fn start(&mut self, autostart: bool) -> Result<()> {
        info!("Starting focuswatch");

        self.spawn_status_logger();

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;
            }
        }

        if autostart {
            // A camera failure leaves the engine idle; the user can retry with 's'
            if let Err(e) = self.engine.start().await {
                error!("Detection could not start: {}", e);
                if !self.keyboard_enabled {
                    return Err(e);
                }
            }
        }

        info!("focuswatch started");
        Ok(())
    }

    /// Log the display-side events the engine publishes
    fn spawn_status_logger(&self) {
        let mut receiver = self.event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec![
                "engine_state_changed",
                "model_readiness_changed",
                "camera_status_changed",
                "system_error",
            ]),
            "status_logger",
        );
        let cancel = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = receiver.recv() => event,
                };

                match event {
                    Ok(FocusEvent::SystemError { component, error }) => {
                        warn!("{} error: {}", component, error);
                    }
                    Ok(event) => info!("{}", event.description()),
                    Err(e) => {
                        debug!("Status logger stopping: {}", e);
                        break;
                    }
                }
            }
        });
    }
}
