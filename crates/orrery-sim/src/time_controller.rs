//! Simulation clock feeding the body graph one Julian date per frame

use hifitime::{Duration, Epoch};

/// Julian date (UTC scale) for an epoch
pub fn epoch_to_jd(epoch: Epoch) -> f64 {
    epoch.to_jde_utc_days()
}

/// Epoch for a Julian date (UTC scale)
pub fn jd_to_epoch(jd: f64) -> Epoch {
    Epoch::from_jde_utc(jd)
}

fn j2000() -> Epoch {
    Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0)
}

/// Variable-rate playback clock clamped to a window around J2000
pub struct TimeController {
    current: Epoch,
    min_epoch: Epoch,
    max_epoch: Epoch,
    /// Simulated seconds per real second; negative runs backwards
    rate: f64,
    paused: bool,
}

impl TimeController {
    /// Real-time clock at J2000 with a ±5000 year window
    pub fn new() -> Self {
        let j2000 = j2000();
        let span = Duration::from_days(5000.0 * 365.25);
        Self {
            current: j2000,
            min_epoch: j2000 - span,
            max_epoch: j2000 + span,
            rate: rates::REALTIME,
            paused: false,
        }
    }

    pub fn at_epoch(epoch: Epoch) -> Self {
        let mut tc = Self::new();
        tc.set_time(epoch);
        tc
    }

    pub fn current(&self) -> Epoch {
        self.current
    }

    /// Current time as a Julian date, the unit the body graph runs on
    pub fn julian_day(&self) -> f64 {
        epoch_to_jd(self.current)
    }

    /// Playback bounds; the current time is pulled inside them
    pub fn set_window(&mut self, start: Epoch, end: Epoch) {
        let (min, max) = if start <= end { (start, end) } else { (end, start) };
        self.min_epoch = min;
        self.max_epoch = max;
        self.set_time(self.current);
    }

    pub fn window(&self) -> (Epoch, Epoch) {
        (self.min_epoch, self.max_epoch)
    }

    pub fn set_time(&mut self, epoch: Epoch) {
        self.current = epoch.clamp(self.min_epoch, self.max_epoch);
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.clamp(-1e9, 1e9);
    }

    pub fn set_rate_days_per_second(&mut self, days: f64) {
        self.set_rate(days * 86400.0);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance by a real-world frame time and return the new epoch
    pub fn tick(&mut self, real_dt_seconds: f64) -> Epoch {
        if !self.paused {
            self.jump(Duration::from_seconds(real_dt_seconds * self.rate));
        }
        self.current
    }

    /// Jump forward or backward by a fixed duration
    pub fn jump(&mut self, duration: Duration) {
        self.set_time(self.current + duration);
    }
}

impl Default for TimeController {
    fn default() -> Self {
        Self::new()
    }
}

/// Preset time rates (simulated seconds per real second)
pub mod rates {
    pub const REALTIME: f64 = 1.0;
    pub const MINUTE_PER_SEC: f64 = 60.0;
    pub const HOUR_PER_SEC: f64 = 3600.0;
    pub const DAY_PER_SEC: f64 = 86400.0;
    pub const WEEK_PER_SEC: f64 = 7.0 * 86400.0;
    pub const YEAR_PER_SEC: f64 = 365.25 * 86400.0;
}
