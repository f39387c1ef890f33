use log::{debug, error, info, warn};

use super::ViewEvents;
use crate::assets::STATS_SUMMARY_EVERY;
use crate::error::ViewerError;
use crate::pipeline::stats::StatsSnapshot;

/// Reports status through the log
#[derive(Debug, Default)]
pub struct LogView {
    connected: bool,
    ticks: u64,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a stats tick; true when it is due at info level.
    fn next_tick(&mut self) -> bool {
        self.ticks += 1;
        self.ticks % STATS_SUMMARY_EVERY == 0
    }
}

impl ViewEvents for LogView {
    fn on_connect(&mut self) {
        self.connected = true;
        self.ticks = 0;
        info!("Connected, waiting for stream");
    }

    fn on_disconnect(&mut self) {
        if std::mem::take(&mut self.connected) {
            warn!("Disconnected");
        }
    }

    fn on_error(&mut self, error: &ViewerError) {
        if error.is_fatal() {
            error!("{}", error);
        } else {
            warn!("{}", error);
        }
    }

    fn on_stats(&mut self, stats: &StatsSnapshot) {
        if !self.connected {
            return;
        }
        if self.next_tick() {
            info!("{}", stats);
        } else {
            debug!("{}", stats);
        }
    }

    fn on_first_frame(&mut self) {
        info!("First frame decoded");
    }
}
