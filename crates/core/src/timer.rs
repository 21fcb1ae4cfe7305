/// What a single one-second tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Time remains.
    Running { remaining_secs: u32 },
    /// The countdown just reached zero. Reported exactly once.
    Expired,
    /// Already expired or stopped; nothing to do.
    Idle,
}

/// One-second resolution countdown driven by an external ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u32,
    fired: bool,
    stopped: bool,
}

impl Countdown {
    #[must_use]
    pub fn new(total_secs: u32) -> Self {
        Self {
            remaining_secs: total_secs,
            fired: false,
            stopped: false,
        }
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.fired
    }

    /// Stop counting without firing, e.g. when the session finished some other way.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn tick(&mut self) -> Tick {
        if self.fired || self.stopped {
            return Tick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.fired = true;
            Tick::Expired
        } else {
            Tick::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn format_mm_ss(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }
}

#[must_use]
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_zero() {
        let mut countdown = Countdown::new(2);
        assert_eq!(countdown.tick(), Tick::Running { remaining_secs: 1 });
        assert_eq!(countdown.tick(), Tick::Expired);
        assert!(countdown.is_expired());
        assert_eq!(countdown.tick(), Tick::Idle);
    }

    #[test]
    fn stopped_countdown_never_fires() {
        let mut countdown = Countdown::new(1);
        countdown.stop();
        assert_eq!(countdown.tick(), Tick::Idle);
        assert!(!countdown.is_expired());
    }

    #[test]
    fn zero_length_countdown_fires_on_first_tick() {
        let mut countdown = Countdown::new(0);
        assert_eq!(countdown.tick(), Tick::Expired);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(Countdown::new(600).format_mm_ss(), "10:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(0), "00:00");
    }
}
