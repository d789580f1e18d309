//! Identifiers and insertion timestamps for origin/destination stop pairs.
//!
//! Identifiers are epoch seconds taken from the wall clock, with the
//! destination always one above the origin. Within a process the generator is
//! monotonic: a pair requested in the same second as the previous one starts
//! right after the last issued identifier instead of colliding with it.
//!
//! A bumped identifier runs ahead of the clock and no longer matches its
//! insertion timestamp, which always comes from the clock. Each bump adds to
//! that lead, so a second process started before the clock catches up can
//! issue the same identifiers again.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Warehouse timestamp layout, microsecond precision.
pub const INSERTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopIds {
    pub origin_id: i64,
    pub origin_time: String,
    pub destination_id: i64,
    pub destination_time: String,
}

#[derive(Debug, Default)]
pub struct StopIdentifier {
    last_issued: Option<i64>,
}

impl StopIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_pair(&mut self) -> StopIds {
        self.pair_at(Utc::now())
    }

    /// Issues a pair as if the clock read `now`. The destination timestamp
    /// is the origin's plus one second.
    pub fn pair_at(&mut self, now: DateTime<Utc>) -> StopIds {
        let clock = now.timestamp();
        let origin_id = match self.last_issued {
            Some(last) if last >= clock => {
                debug!(clock, origin_id = last + 1, lead_s = last + 1 - clock, "stop id ahead of clock");
                last + 1
            }
            _ => clock,
        };
        let destination_id = origin_id + 1;
        self.last_issued = Some(destination_id);

        StopIds {
            origin_id,
            origin_time: format_insertion_time(now),
            destination_id,
            destination_time: format_insertion_time(now + TimeDelta::seconds(1)),
        }
    }
}

pub fn format_insertion_time(at: DateTime<Utc>) -> String {
    at.format(INSERTION_TIME_FORMAT).to_string()
}
