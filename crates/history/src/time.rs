use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
pub const UNIX_OFFSET_SECONDS: i64 = 978_307_200;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Platform timestamp: nanoseconds since 2001-01-01T00:00:00Z.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlatformTime(pub i64);

impl PlatformTime {
    pub const ZERO: Self = Self(0);

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn to_unix_seconds(self) -> f64 {
        self.0 as f64 / NANOS_PER_SECOND as f64 + UNIX_OFFSET_SECONDS as f64
    }

    pub fn from_unix_seconds(seconds: f64) -> Self {
        let platform = (seconds - UNIX_OFFSET_SECONDS as f64) * NANOS_PER_SECOND as f64;
        // `as` saturates on overflow and maps NaN to zero.
        Self(platform.round() as i64)
    }

    /// Wall-clock time, or `None` when outside chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let seconds = self.0.div_euclid(NANOS_PER_SECOND) + UNIX_OFFSET_SECONDS;
        let nanos = u32::try_from(self.0.rem_euclid(NANOS_PER_SECOND)).ok()?;
        DateTime::from_timestamp(seconds, nanos)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_2001() {
        assert_eq!(PlatformTime::ZERO.to_unix_seconds(), 978_307_200.0);
        assert_eq!(
            PlatformTime::ZERO.to_datetime().unwrap().to_rfc3339(),
            "2001-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn unix_seconds_round_trip() {
        let t = PlatformTime::from_unix_seconds(1_700_000_000.5);
        assert_eq!(t.as_nanos(), (1_700_000_000 - 978_307_200) * 1_000_000_000 + 500_000_000);
        assert_eq!(t.to_unix_seconds(), 1_700_000_000.5);
    }

    #[test]
    fn negative_times_are_before_2001() {
        let t = PlatformTime(-1_500_000_000);
        let dt = t.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), UNIX_OFFSET_SECONDS - 2);
        assert_eq!(dt.timestamp_subsec_nanos(), 500_000_000);
    }
}
