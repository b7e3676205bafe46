use super::types::AppCommand;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Map a pressed key to an application command
pub fn command_for_key(code: KeyCode) -> Option<AppCommand> {
    match code {
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char(' ') => {
            Some(AppCommand::ToggleDetection)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(AppCommand::Quit),
        _ => None,
    }
}

/// Terminal key handler: `s` toggles detection, `q`/Esc quits
pub struct KeyboardInputHandler {
    commands: mpsc::UnboundedSender<AppCommand>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(commands: mpsc::UnboundedSender<AppCommand>) -> Self {
        Self {
            commands,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - press 's' to start/stop, 'q' to quit");

        let commands = self.commands.clone();
        let cancellation_token = self.cancellation_token.clone();

        // Raw-mode polling blocks, keep it off the runtime threads
        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match command_for_key(key_event.code) {
                            Some(command) => {
                                debug!("Key {:?} -> {:?}", key_event.code, command);
                                if commands.send(command).is_err() {
                                    warn!("Command receiver dropped, keyboard handler exiting");
                                    break;
                                }
                                if command == AppCommand::Quit {
                                    break;
                                }
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the polling task one poll period to restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            command_for_key(KeyCode::Char('s')),
            Some(AppCommand::ToggleDetection)
        );
        assert_eq!(
            command_for_key(KeyCode::Char(' ')),
            Some(AppCommand::ToggleDetection)
        );
        assert_eq!(command_for_key(KeyCode::Char('q')), Some(AppCommand::Quit));
        assert_eq!(command_for_key(KeyCode::Esc), Some(AppCommand::Quit));
        assert_eq!(command_for_key(KeyCode::Char('x')), None);
        assert_eq!(command_for_key(KeyCode::Enter), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_creation() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let handler = KeyboardInputHandler::new(sender);

        assert!(!handler.is_stopped());
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let handler = KeyboardInputHandler::new(sender);

        handler.stop().await.unwrap();
        assert!(handler.is_stopped());
    }
}
