use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::Actor;
use super::office_hours::OfficeHoursPolicy;
use super::settings::SettingsService;
use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, WorkLocation};
use crate::model::employee::Employee;
use crate::model::settings::PayrollSettings;
use crate::store::{self, SharedStore};

/// Classifies one attendance day.
///
/// No check-in is an absence. With both timestamps, the worked hours decide
/// between absent, half-day and a full day; a full day that started after the
/// grace period is late. An open check-in counts as a full day.
pub fn classify(
    date: NaiveDate,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    policy: &dyn OfficeHoursPolicy,
    settings: &PayrollSettings,
) -> AttendanceStatus {
    let Some(check_in) = check_in else {
        return AttendanceStatus::Absent;
    };

    if let Some(check_out) = check_out {
        let worked_hours = (check_out - check_in).num_minutes().max(0) as f64 / 60.0;
        if worked_hours < settings.half_day_hours {
            return AttendanceStatus::Absent;
        }
        if worked_hours < settings.full_day_hours {
            return AttendanceStatus::HalfDay;
        }
    }

    if policy.is_late(date, check_in) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ManualEntry {
    pub employee_id: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:00:00")]
    pub check_out: Option<NaiveTime>,
    #[serde(default)]
    pub location: WorkLocation,
}

#[derive(Clone)]
pub struct AttendanceService {
    store: SharedStore,
    settings: SettingsService,
    policy: Arc<dyn OfficeHoursPolicy>,
}

impl AttendanceService {
    pub fn new(store: SharedStore, settings: SettingsService, policy: Arc<dyn OfficeHoursPolicy>) -> Self {
        Self {
            store,
            settings,
            policy,
        }
    }

    async fn save_classified(&self, mut record: AttendanceRecord) -> ServiceResult<AttendanceRecord> {
        let settings = self.settings.load().await?;
        record.status = classify(
            record.date,
            record.check_in,
            record.check_out,
            self.policy.as_ref(),
            &settings,
        );
        record.updated_at = Utc::now();
        store::save(self.store.as_ref(), &record).await?;
        Ok(record)
    }

    pub async fn check_in(
        &self,
        actor: &Actor,
        at: NaiveDateTime,
        location: WorkLocation,
    ) -> ServiceResult<AttendanceRecord> {
        let employee_id = actor.employee_id()?;
        let date = at.date();
        let id = AttendanceRecord::key(employee_id, date);

        if let Some(existing) = store::fetch::<AttendanceRecord>(self.store.as_ref(), &id).await? {
            if existing.check_in.is_some() {
                warn!(employee_id, %date, "Duplicate check-in");
                return Err(ServiceError::validation("Already checked in today"));
            }
        }

        let record = AttendanceRecord {
            id,
            employee_id: employee_id.to_string(),
            date,
            check_in: Some(at.time()),
            check_out: None,
            status: AttendanceStatus::Present,
            location,
            manual: false,
            updated_at: Utc::now(),
        };
        let record = self.save_classified(record).await?;

        info!(employee_id, %date, status = %record.status, "Checked in");
        Ok(record)
    }

    pub async fn check_out(&self, actor: &Actor, at: NaiveDateTime) -> ServiceResult<AttendanceRecord> {
        let employee_id = actor.employee_id()?;
        let date = at.date();
        let id = AttendanceRecord::key(employee_id, date);

        let mut record = match store::fetch::<AttendanceRecord>(self.store.as_ref(), &id).await? {
            Some(r) if r.check_in.is_some() && r.check_out.is_none() => r,
            _ => return Err(ServiceError::validation("No active check-in found for today")),
        };
        if record.check_in.is_some_and(|check_in| at.time() < check_in) {
            return Err(ServiceError::validation("check-out cannot precede check-in"));
        }

        record.check_out = Some(at.time());
        let record = self.save_classified(record).await?;

        info!(employee_id, %date, status = %record.status, "Checked out");
        Ok(record)
    }

    /// Administrative create-or-replace for any employee and date.
    pub async fn manual_entry(&self, actor: &Actor, entry: ManualEntry) -> ServiceResult<AttendanceRecord> {
        actor.require_hr_or_admin()?;
        store::fetch_required::<Employee>(self.store.as_ref(), &entry.employee_id).await?;

        match (entry.check_in, entry.check_out) {
            (None, Some(_)) => return Err(ServiceError::validation("check_out requires check_in")),
            (Some(i), Some(o)) if o < i => {
                return Err(ServiceError::validation("check-out cannot precede check-in"));
            }
            _ => {}
        }

        let record = AttendanceRecord {
            id: AttendanceRecord::key(&entry.employee_id, entry.date),
            employee_id: entry.employee_id,
            date: entry.date,
            check_in: entry.check_in,
            check_out: entry.check_out,
            status: AttendanceStatus::Absent,
            location: entry.location,
            manual: true,
            updated_at: Utc::now(),
        };
        let record = self.save_classified(record).await?;

        info!(
            employee_id = %record.employee_id,
            date = %record.date,
            status = %record.status,
            user_id = %actor.user_id,
            "Manual attendance entry"
        );
        Ok(record)
    }
}
