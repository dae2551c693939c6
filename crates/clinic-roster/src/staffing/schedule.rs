use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};

/// Fixed weekly firing time for the evaluation cycle, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSchedule {
    pub weekday: Weekday,
    pub hour: u32,
}

impl Default for EvaluationSchedule {
    fn default() -> Self {
        Self {
            weekday: Weekday::Fri,
            hour: 16,
        }
    }
}

impl EvaluationSchedule {
    /// First instant strictly after `now` matching the schedule.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour = self.hour.min(23);
        let mut day = now.date_naive();
        // Eight days always contain the next strictly-future firing time.
        for _ in 0..8 {
            if day.weekday() == self.weekday {
                if let Some(naive) = day.and_hms_opt(hour, 0, 0) {
                    let at = Utc.from_utc_datetime(&naive);
                    if at > now {
                        return at;
                    }
                }
            }
            day = day.succ_opt().unwrap_or(day);
        }
        now
    }
}
