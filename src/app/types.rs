/// Why the application is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}

/// Commands issued by the keyboard handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start detection when idle, stop it when running
    ToggleDetection,
    Quit,
}
