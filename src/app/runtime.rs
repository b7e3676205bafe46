use super::types::AppCommand;
use super::{FocusApp, ShutdownReason};
use crate::error::{FocusError, Result};
use crate::events::FocusEvent;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

impl FocusApp {
    /// Run until a signal or the quit key, then shut down gracefully
    pub async fn run(&mut self) -> Result<i32> {
        info!("focuswatch is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| FocusError::system("Shutdown sender already taken"))?;
        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| FocusError::system("Shutdown receiver already taken"))?;
        let mut commands = self
            .command_receiver
            .take()
            .ok_or_else(|| FocusError::system("Command receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        let shutdown_reason = loop {
            tokio::select! {
                reason = &mut shutdown_receiver => {
                    break reason.map_err(|_| {
                        FocusError::system("Shutdown channel closed unexpectedly")
                    })?;
                }
                command = commands.recv() => {
                    if let Some(reason) = self.handle_command(command).await {
                        break reason;
                    }
                }
            }
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);
        self.event_bus.emit(FocusEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: format!("{:?}", shutdown_reason),
        });

        let exit_code = self.shutdown(&shutdown_reason).await?;

        info!("focuswatch shutdown complete");
        Ok(exit_code)
    }

    /// Apply one command; returns a shutdown reason when the app should exit
    pub(super) async fn handle_command(
        &self,
        command: Option<AppCommand>,
    ) -> Option<ShutdownReason> {
        match command {
            Some(AppCommand::ToggleDetection) => {
                if self.engine.state().is_active() {
                    self.engine.stop().await;
                } else if let Err(e) = self.engine.start().await {
                    error!("Detection could not start: {}", e);
                }
                None
            }
            Some(AppCommand::Quit) => Some(ShutdownReason::UserRequest),
            // The app keeps its own sender, so the channel never closes
            None => None,
        }
    }

    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM (service stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
