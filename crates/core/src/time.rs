use chrono::{DateTime, Duration, Utc};

/// Source of "now" for the game and progress layers.
///
/// The session state machine never reads the wall clock itself; callers pass
/// timestamps obtained from a `Clock`, which keeps play-throughs replayable in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that follows the system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock pinned at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. No effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Whole seconds between two instants, clamped at zero.
#[must_use]
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` pinned at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(42));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(42));
        assert!(clock.is_fixed());
    }

    #[test]
    fn elapsed_is_clamped_at_zero() {
        let now = fixed_now();
        assert_eq!(elapsed_secs(now, now + Duration::seconds(90)), 90);
        assert_eq!(elapsed_secs(now + Duration::seconds(5), now), 0);
    }
}
