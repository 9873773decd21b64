//! Upload progress as whole percentages.

use std::sync::{Arc, Mutex};

/// Callback receiving upload progress, 0 to 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Highest percentage reported before the server confirms the upload.
const IN_FLIGHT_CEILING: u8 = 99;

/// Converts byte counters into monotonically growing percentages.
///
/// A percentage is only reported when it exceeds the last one reported.
/// Bytes handed to the transport count up to 99; only `finish` reports 100.
pub struct ProgressTracker {
    total: u64,
    state: Mutex<Counters>,
    callback: ProgressFn,
}

#[derive(Default)]
struct Counters {
    sent: u64,
    reported: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: ProgressFn) -> Self {
        Self {
            total,
            state: Mutex::new(Counters::default()),
            callback,
        }
    }

    /// Record `bytes` more handed to the transport.
    pub fn advance(&self, bytes: u64) {
        let percent = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.sent = state.sent.saturating_add(bytes);
            let percent = percent_of(state.sent, self.total).min(IN_FLIGHT_CEILING);
            if state.reported.is_some_and(|last| last >= percent) {
                return;
            }
            state.reported = Some(percent);
            percent
        };
        (self.callback)(percent);
    }

    /// Report completion.
    pub fn finish(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.reported == Some(100) {
            return;
        }
        state.reported = Some(100);
        drop(state);
        (self.callback)(100);
    }
}

/// Integer percentage of `sent` over `total`; an empty payload is complete.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (sent.min(total) as u128 * 100 / total as u128) as u8;
    percent.min(100)
}
