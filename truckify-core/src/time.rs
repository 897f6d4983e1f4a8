//! Wall-clock timestamps and plan-relative time windows.
//!
//! Position reports carry absolute [`Timestamp`]s. Plans work in offsets from
//! their own start so that a plan can be rebased when it is re-optimized
//! part-way through the day.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Milliseconds since the Unix epoch.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use truckify_core::Timestamp;
///
/// let start = Timestamp::from_secs(100);
/// let later = start.saturating_add(Duration::from_millis(1_500));
/// assert_eq!(later.as_millis(), 101_500);
/// assert_eq!(later.saturating_duration_since(start), Duration::from_millis(1_500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Construct from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Construct from whole seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000))
    }

    /// Current wall-clock time. A clock set before the epoch reads as zero.
    #[must_use]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(Self(0), |elapsed| {
                Self(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            })
    }

    /// Milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Advance by `offset`, saturating at the maximum representable instant.
    #[must_use]
    pub fn saturating_add(self, offset: Duration) -> Self {
        let millis = u64::try_from(offset.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Time elapsed since `earlier`, or zero when `earlier` is in the future.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Errors returned by [`TimeWindow::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeWindowError {
    /// The window closes before it opens.
    #[error("time window closes ({latest:?}) before it opens ({earliest:?})")]
    Inverted {
        /// Opening offset.
        earliest: Duration,
        /// Closing offset.
        latest: Duration,
    },
}

/// Interval during which service at a stop may begin.
///
/// Both bounds are offsets from the start of the plan and are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest service start.
    #[serde(with = "duration_secs")]
    pub earliest: Duration,
    /// Latest allowed arrival.
    #[serde(with = "duration_secs")]
    pub latest: Duration,
}

impl TimeWindow {
    /// Validate and construct a window.
    ///
    /// # Errors
    ///
    /// Returns [`TimeWindowError::Inverted`] when `earliest > latest`.
    pub const fn new(earliest: Duration, latest: Duration) -> Result<Self, TimeWindowError> {
        if earliest.as_nanos() > latest.as_nanos() {
            return Err(TimeWindowError::Inverted { earliest, latest });
        }
        Ok(Self { earliest, latest })
    }

    /// Whether the bounds are ordered.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.earliest.as_nanos() <= self.latest.as_nanos()
    }

    /// Shift the window towards the plan start by `elapsed`.
    ///
    /// Used when a plan is re-optimized after it started: the new plan starts
    /// `elapsed` later, so every offset shrinks. Returns `None` when the window
    /// has already closed.
    #[must_use]
    pub fn rebased(&self, elapsed: Duration) -> Option<Self> {
        let latest = self.latest.checked_sub(elapsed)?;
        let earliest = self.earliest.saturating_sub(elapsed);
        Some(Self { earliest, latest })
    }
}

/// Serialise [`Duration`] values as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialise a duration as seconds.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    /// Deserialise a non-negative number of seconds.
    ///
    /// # Errors
    ///
    /// Fails for negative or non-finite values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

/// Serialise optional [`Duration`] values as fractional seconds.
pub mod option_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialise an optional duration as seconds or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialise optional non-negative seconds.
    ///
    /// # Errors
    ///
    /// Fails for negative or non-finite values.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}
