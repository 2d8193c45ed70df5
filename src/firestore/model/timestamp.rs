use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::firestore::constants::NANOS_PER_SECOND;
use crate::firestore::error::{invalid_argument, FirestoreResult};

/// Smallest representable backend timestamp, `0001-01-01T00:00:00Z`.
const MIN_SECONDS: i64 = -62_135_596_800;
/// Largest representable backend timestamp, `9999-12-31T23:59:59.999999999Z`.
const MAX_SECONDS: i64 = 253_402_300_799;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_millis(millis: i64) -> Self {
        let seconds = millis.div_euclid(1000);
        let nanos = (millis.rem_euclid(1000) * 1_000_000) as i32;
        Self { seconds, nanos }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self {
                seconds: duration.as_secs() as i64,
                nanos: duration.subsec_nanos() as i32,
            },
            Err(err) => {
                let duration = err.duration();
                Self::new(
                    -(duration.as_secs() as i64),
                    -(duration.subsec_nanos() as i32),
                )
            }
        }
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.seconds >= 0 {
            UNIX_EPOCH + Duration::from_secs(self.seconds as u64) + Duration::from_nanos(self.nanos as u64)
        } else {
            UNIX_EPOCH - Duration::from_secs(self.seconds.unsigned_abs())
                + Duration::from_nanos(self.nanos as u64)
        }
    }

    pub fn to_millis(&self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanos / 1_000_000)
    }

    /// Drops sub-microsecond precision, matching what the backend stores.
    pub fn truncate_to_micros(&self) -> Self {
        Self {
            seconds: self.seconds,
            nanos: (self.nanos / 1000) * 1000,
        }
    }

    /// Checks the value falls inside the range the backend accepts and that
    /// `nanos` lies in `[0, 1e9)`.
    pub fn validate(&self) -> FirestoreResult<()> {
        if !(0..NANOS_PER_SECOND).contains(&self.nanos) {
            return Err(invalid_argument(format!(
                "Timestamp nanoseconds out of range: {}",
                self.nanos
            )));
        }
        if self.seconds < MIN_SECONDS {
            return Err(invalid_argument(format!(
                "Timestamp seconds out of range: {}",
                self.seconds
            )));
        }
        if self.seconds > MAX_SECONDS {
            return Err(invalid_argument(format!(
                "Timestamp seconds out of range: {}",
                self.seconds
            )));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let extra_seconds = self.nanos.div_euclid(NANOS_PER_SECOND);
        self.seconds = self.seconds.saturating_add(i64::from(extra_seconds));
        self.nanos = self.nanos.rem_euclid(NANOS_PER_SECOND);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Timestamp(seconds={}, nanos={})", self.seconds, self.nanos)
    }
}
