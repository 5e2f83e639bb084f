use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Source of completion timestamps for lessons and quizzes.
///
/// Readings are truncated to whole milliseconds, the precision of the stored
/// RFC 3339 form, so a record compares equal to itself after a save and reload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// A clock that always reads `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at.trunc_subsecs(3))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now().trunc_subsecs(3),
            Clock::Fixed(at) => *at,
        }
    }

    /// Move a fixed clock forward, e.g. to stamp a later lesson completion.
    /// The system clock keeps reading real time.
    pub fn step_by(&mut self, delta: Duration) {
        if let Clock::Fixed(at) = self {
            *at = (*at + delta).trunc_subsecs(3);
        }
    }
}

/// 2024-03-01T09:00:00Z, a deterministic "now" for tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_709_283_600)
}

/// A `Clock` pinned at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_steps_forward() {
        let mut clock = fixed_clock();
        clock.step_by(Duration::minutes(5));
        assert_eq!(clock.now(), fixed_now() + Duration::minutes(5));
        assert_eq!(fixed_now().to_rfc3339(), "2024-03-01T09:00:00+00:00");
    }

    #[test]
    fn system_clock_ignores_steps() {
        let mut clock = Clock::system();
        clock.step_by(Duration::days(1));
        assert_eq!(clock, Clock::System);
    }

    #[test]
    fn readings_are_truncated_to_milliseconds() {
        let at = fixed_now() + Duration::nanoseconds(1_234_567);
        assert_eq!(Clock::fixed(at).now(), fixed_now() + Duration::milliseconds(1));
        assert_eq!(Clock::system().now().timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
