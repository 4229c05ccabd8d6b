use chrono::{Duration, NaiveDate, NaiveTime};

/// Decides whether a check-in counts as late.
pub trait OfficeHoursPolicy: Send + Sync {
    fn is_late(&self, date: NaiveDate, check_in: NaiveTime) -> bool;
}

/// Same start time and grace period every day.
#[derive(Debug, Clone)]
pub struct FixedOfficeHours {
    start: NaiveTime,
    grace: Duration,
}

impl FixedOfficeHours {
    pub fn new(start: NaiveTime, grace_minutes: i64) -> Self {
        Self {
            start,
            grace: Duration::minutes(grace_minutes.max(0)),
        }
    }
}

impl Default for FixedOfficeHours {
    fn default() -> Self {
        Self::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN), 15)
    }
}

impl OfficeHoursPolicy for FixedOfficeHours {
    fn is_late(&self, _date: NaiveDate, check_in: NaiveTime) -> bool {
        let (deadline, wrapped) = self.start.overflowing_add_signed(self.grace);
        // Grace running past midnight means nobody is late.
        wrapped == 0 && check_in > deadline
    }
}
