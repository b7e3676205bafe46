use crate::engine::VerdictListener;
use crate::verdict::DistractionVerdict;
use chrono::Local;
use parking_lot::Mutex;
use std::io::{self, Write};
use tracing::{debug, info, warn};

const BELL: &str = "\x07";

#[derive(Debug, Default)]
struct PresenterState {
    alerting: bool,
    banner: Option<String>,
    bells: u32,
}

/// Host-side presentation of verdicts.
///
/// Shows the banner while distracted and rings the terminal bell once per
/// transition into distraction. A `none` verdict clears the banner.
pub struct AlertPresenter {
    state: Mutex<PresenterState>,
    out: Mutex<Box<dyn Write + Send>>,
    bell_enabled: bool,
}

impl AlertPresenter {
    pub fn new(bell_enabled: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), bell_enabled)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, bell_enabled: bool) -> Self {
        Self {
            state: Mutex::new(PresenterState::default()),
            out: Mutex::new(out),
            bell_enabled,
        }
    }

    pub fn is_alerting(&self) -> bool {
        self.state.lock().alerting
    }

    /// Message currently on display, if any
    pub fn banner(&self) -> Option<String> {
        self.state.lock().banner.clone()
    }

    /// Bells rung since creation
    pub fn bell_count(&self) -> u32 {
        self.state.lock().bells
    }

    pub fn present(&self, verdict: &DistractionVerdict) {
        let mut state = self.state.lock();
        let stamp = Local::now().format("%H:%M:%S");

        if verdict.distracted {
            let ring = !state.alerting;
            if ring {
                state.bells += 1;
            }
            state.alerting = true;
            state.banner = Some(verdict.message.clone());

            info!(kind = %verdict.kind, "Distraction: {}", verdict.message);
            let bell = if ring && self.bell_enabled { BELL } else { "" };
            self.write(&format!("{}[{}] {}\r\n", bell, stamp, verdict.message));
        } else if state.alerting || state.banner.is_some() {
            state.alerting = false;
            state.banner = None;

            info!("Distraction cleared");
            self.write(&format!("[{}] Back on track\r\n", stamp));
        } else {
            debug!("Verdict none while already clear");
        }
    }

    fn write(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
            warn!("Failed to write alert: {}", e);
        }
    }
}

impl VerdictListener for AlertPresenter {
    fn on_verdict_change(&self, verdict: &DistractionVerdict) {
        self.present(verdict);
    }
}
