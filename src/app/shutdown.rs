use super::{FocusApp, ShutdownReason};
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const ENGINE_STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl FocusApp {
    /// Stop detection and restore the terminal. Always stops the engine,
    /// even when it is already idle.
    pub async fn shutdown(&mut self, reason: &ShutdownReason) -> Result<i32> {
        info!("Beginning graceful shutdown ({:?})", reason);

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                if let Err(e) = keyboard_handler.stop().await {
                    error!("Error stopping keyboard: {}", e);
                    exit_code = 1;
                }
            }
        }

        if timeout(ENGINE_STOP_TIMEOUT, self.engine.stop()).await.is_err() {
            error!("Detection engine stop timeout");
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
