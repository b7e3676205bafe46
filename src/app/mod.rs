pub mod keyboard_input;

mod alert;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;

#[cfg(test)]
mod tests;

pub use alert::AlertPresenter;
pub use keyboard_input::KeyboardInputHandler;
pub use orchestrator::FocusApp;
pub use types::{AppCommand, ShutdownReason};
