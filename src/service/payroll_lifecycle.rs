use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use super::aggregator::FactAggregator;
use super::computation::recompute;
use super::settings::SettingsService;
use super::{Actor, ItemOutcome};
use crate::error::{ServiceError, ServiceResult};
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::payroll::{
    EditableField, PayrollAction, PayrollKey, PayrollRecord, PayrollStatus, validate_period,
};
use crate::model::settings::PayrollSettings;
use crate::store::{self, Filter, SharedStore};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationReport {
    pub month: u32,
    pub year: i32,
    /// Records created by this run
    pub created: Vec<String>,
    /// Employees that already had a record for the period
    pub skipped: Vec<String>,
    pub failed: Vec<ItemOutcome>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct PayrollFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub employee_id: Option<String>,
    pub status: Option<PayrollStatus>,
}

enum Generated {
    Created(String),
    Skipped(String),
}

/// Monthly generation, manual adjustment and bulk status changes.
#[derive(Clone)]
pub struct PayrollLifecycle {
    store: SharedStore,
    settings: SettingsService,
    aggregator: FactAggregator,
}

impl PayrollLifecycle {
    pub fn new(store: SharedStore, settings: SettingsService, aggregator: FactAggregator) -> Self {
        Self {
            store,
            settings,
            aggregator,
        }
    }

    pub async fn get(&self, actor: &Actor, id: &str) -> ServiceResult<PayrollRecord> {
        let record: PayrollRecord = store::fetch_required(self.store.as_ref(), id).await?;
        if !actor.is_admin() && actor.employee_id.as_deref() != Some(record.employee_id.as_str()) {
            return Err(ServiceError::forbidden("Not allowed to view this payroll record"));
        }
        Ok(record)
    }

    pub async fn list(&self, actor: &Actor, filter: &PayrollFilter) -> ServiceResult<Vec<PayrollRecord>> {
        actor.require_admin()?;

        let mut filters = Vec::new();
        if let Some(employee_id) = &filter.employee_id {
            filters.push(Filter::eq("employee_id", employee_id.as_str()));
        }
        if let Some(status) = filter.status {
            filters.push(Filter::eq("status", status.to_string()));
        }

        let mut records: Vec<PayrollRecord> = store::fetch_all(self.store.as_ref(), &filters).await?;
        records.retain(|r| {
            filter.month.is_none_or(|m| r.month == m) && filter.year.is_none_or(|y| r.year == y)
        });
        records.sort_by(|a, b| (b.year, b.month, &a.employee_id).cmp(&(a.year, a.month, &b.employee_id)));
        Ok(records)
    }

    /// A pending record for `key` with facts and totals filled in. Not saved.
    async fn build_record(
        &self,
        key: &PayrollKey,
        employee: &Employee,
        settings: &PayrollSettings,
    ) -> ServiceResult<PayrollRecord> {
        let mut record = PayrollRecord::seeded(key, employee, Utc::now());
        let facts = self
            .aggregator
            .aggregate_with(&key.employee_id, key.month, key.year, settings)
            .await?;
        record.apply_facts(&facts);
        recompute(&mut record, settings)?;
        Ok(record)
    }

    async fn generate_one(
        &self,
        employee: &Employee,
        month: u32,
        year: i32,
        settings: &PayrollSettings,
    ) -> ServiceResult<Generated> {
        let key = PayrollKey::new(&employee.id, month, year)?;
        let id = key.to_string();
        if store::fetch::<PayrollRecord>(self.store.as_ref(), &id).await?.is_some() {
            return Ok(Generated::Skipped(id));
        }

        let record = self.build_record(&key, employee, settings).await?;
        store::save(self.store.as_ref(), &record).await?;
        Ok(Generated::Created(id))
    }

    /// One record per active employee for the period. Existing records,
    /// including their manual edits, are left alone.
    pub async fn generate(&self, actor: &Actor, month: u32, year: i32) -> ServiceResult<GenerationReport> {
        actor.require_admin()?;
        validate_period(month, year)?;

        let settings = self.settings.load().await?;
        let employees: Vec<Employee> = store::fetch_all(
            self.store.as_ref(),
            &[Filter::eq("status", EmployeeStatus::Active.to_string())],
        )
        .await?;

        let results = join_all(
            employees
                .iter()
                .map(|e| self.generate_one(e, month, year, &settings)),
        )
        .await;

        let mut report = GenerationReport {
            month,
            year,
            created: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };
        for (employee, result) in employees.iter().zip(results) {
            match result {
                Ok(Generated::Created(id)) => report.created.push(id),
                Ok(Generated::Skipped(id)) => report.skipped.push(id),
                Err(e) => {
                    warn!(employee_id = %employee.id, month, year, error = %e, "Payroll generation failed");
                    report.failed.push(ItemOutcome::failure(employee.id.as_str(), &e));
                }
            }
        }

        info!(
            month,
            year,
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            user_id = %actor.user_id,
            "Payroll generated"
        );
        Ok(report)
    }

    /// Sets one manual adjustment and recomputes the totals. A record that
    /// does not exist yet is created from the employee and period in its id.
    pub async fn update_field(
        &self,
        actor: &Actor,
        record_id: &str,
        field: &str,
        value: f64,
    ) -> ServiceResult<PayrollRecord> {
        actor.require_admin()?;
        let field: EditableField = field
            .parse()
            .map_err(|_| ServiceError::validation(format!("{} is not an editable payroll field", field)))?;

        let settings = self.settings.load().await?;
        let mut record = match store::fetch::<PayrollRecord>(self.store.as_ref(), record_id).await? {
            Some(record) => record,
            None => {
                let key: PayrollKey = record_id.parse()?;
                let employee: Employee = store::fetch_required(self.store.as_ref(), &key.employee_id).await?;
                info!(record_id, "Materializing payroll record on first edit");
                self.build_record(&key, &employee, &settings).await?
            }
        };

        record.set_field(field, value)?;
        recompute(&mut record, &settings)?;
        record.updated_at = Utc::now();
        store::save(self.store.as_ref(), &record).await?;

        info!(
            record_id,
            field = %field,
            value,
            total_deduction = record.total_deduction,
            net_payable_salary = record.net_payable_salary,
            user_id = %actor.user_id,
            "Payroll field updated"
        );
        Ok(record)
    }

    async fn decide_one(&self, id: &str, action: PayrollAction, approver_id: &str) -> ServiceResult<PayrollStatus> {
        let mut record: PayrollRecord = store::fetch_required(self.store.as_ref(), id).await?;
        record.decide(action, approver_id, Utc::now())?;
        store::save(self.store.as_ref(), &record).await?;
        Ok(record.status)
    }

    /// Each record transitions independently; there is no batch rollback.
    pub async fn bulk_decide(
        &self,
        actor: &Actor,
        record_ids: &[String],
        action: PayrollAction,
    ) -> ServiceResult<Vec<ItemOutcome>> {
        actor.require_admin()?;
        let approver_id = actor.employee_id.clone().unwrap_or_else(|| actor.user_id.clone());

        let outcomes = join_all(record_ids.iter().map(|id| {
            let approver_id = approver_id.as_str();
            async move { ItemOutcome::from_result(id, self.decide_one(id, action, approver_id).await) }
        }))
        .await;

        let failed = outcomes.iter().filter(|o| !o.ok).count();
        info!(action = %action, total = outcomes.len(), failed, user_id = %actor.user_id, "Payroll bulk decision");
        Ok(outcomes)
    }

    async fn pay_one(&self, id: &str) -> ServiceResult<PayrollStatus> {
        let mut record: PayrollRecord = store::fetch_required(self.store.as_ref(), id).await?;
        record.mark_paid(Utc::now())?;
        store::save(self.store.as_ref(), &record).await?;
        Ok(record.status)
    }

    pub async fn mark_paid(&self, actor: &Actor, record_ids: &[String]) -> ServiceResult<Vec<ItemOutcome>> {
        actor.require_admin()?;

        let outcomes = join_all(
            record_ids
                .iter()
                .map(|id| async move { ItemOutcome::from_result(id, self.pay_one(id).await) }),
        )
        .await;

        let failed = outcomes.iter().filter(|o| !o.ok).count();
        info!(total = outcomes.len(), failed, user_id = %actor.user_id, "Payroll marked paid");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::model::attendance::{AttendanceRecord, AttendanceStatus, WorkLocation};
    use crate::service::office_hours::FixedOfficeHours;
    use crate::service::testing::{admin, employee, staff};
    use crate::store::memory::MemoryDocumentStore;

    async fn setup() -> (PayrollLifecycle, SharedStore) {
        let store: SharedStore = Arc::new(MemoryDocumentStore::new());
        let settings = SettingsService::new(store.clone());
        let aggregator = FactAggregator::new(
            store.clone(),
            settings.clone(),
            Arc::new(FixedOfficeHours::default()),
        );

        store::save(store.as_ref(), &employee("e1", None, Some(30000.0))).await.unwrap();
        store::save(store.as_ref(), &employee("e2", None, Some(45000.0))).await.unwrap();
        let mut gone = employee("e3", None, Some(20000.0));
        gone.status = EmployeeStatus::Terminated;
        store::save(store.as_ref(), &gone).await.unwrap();

        (PayrollLifecycle::new(store.clone(), settings, aggregator), store)
    }

    async fn late_days(store: &SharedStore, employee_id: &str, days: u32) {
        for d in 1..=days {
            let date = NaiveDate::from_ymd_opt(2026, 6, d).unwrap();
            let record = AttendanceRecord {
                id: AttendanceRecord::key(employee_id, date),
                employee_id: employee_id.into(),
                date,
                check_in: NaiveTime::from_hms_opt(10, 0, 0),
                check_out: NaiveTime::from_hms_opt(18, 30, 0),
                status: AttendanceStatus::Late,
                location: WorkLocation::Office,
                manual: false,
                updated_at: Utc::now(),
            };
            store::save(store.as_ref(), &record).await.unwrap();
        }
    }

    fn net_matches_total(r: &PayrollRecord) -> bool {
        r.net_payable_salary == (r.basic_salary.unwrap() - r.total_deduction).max(0.0)
    }

    #[actix_web::test]
    async fn generate_creates_one_record_per_active_employee() {
        let (lifecycle, store) = setup().await;
        late_days(&store, "e1", 7).await;

        let report = lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        let mut created = report.created.clone();
        created.sort();
        assert_eq!(created, vec!["e1_2026_06", "e2_2026_06"]);
        assert!(report.failed.is_empty());

        let r1 = lifecycle.get(&admin(), "e1_2026_06").await.unwrap();
        assert_eq!(r1.total_late_days, 7);
        assert_eq!(r1.late_penalty, 2000.0);
        assert_eq!(r1.net_payable_salary, 28000.0);
        assert!(net_matches_total(&r1));
    }

    #[actix_web::test]
    async fn regeneration_preserves_manual_edits() {
        let (lifecycle, _) = setup().await;
        lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        lifecycle
            .update_field(&admin(), "e1_2026_06", "festival_bonus", 1500.0)
            .await
            .unwrap();

        let report = lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.skipped.len(), 2);

        let r1 = lifecycle.get(&admin(), "e1_2026_06").await.unwrap();
        assert_eq!(r1.festival_bonus, 1500.0);
        assert_eq!(lifecycle.list(&admin(), &PayrollFilter::default()).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn employee_without_salary_is_reported_not_zeroed() {
        let (lifecycle, store) = setup().await;
        store::save(store.as_ref(), &employee("e4", None, None)).await.unwrap();

        let report = lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "e4");
        assert!(store::fetch::<PayrollRecord>(store.as_ref(), "e4_2026_06").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn update_field_recomputes_totals() {
        let (lifecycle, store) = setup().await;
        late_days(&store, "e1", 7).await;
        lifecycle.generate(&admin(), 6, 2026).await.unwrap();

        for (field, value) in [
            ("loan_deduction", 500.0),
            ("ait", 300.0),
            ("festival_bonus", 1000.0),
            ("lunch_subsidy", 200.0),
        ] {
            let r = lifecycle.update_field(&admin(), "e1_2026_06", field, value).await.unwrap();
            assert!(net_matches_total(&r));
        }

        let r = lifecycle.get(&admin(), "e1_2026_06").await.unwrap();
        assert_eq!(r.total_deduction, 1600.0);
        assert_eq!(r.net_payable_salary, 28400.0);
    }

    #[actix_web::test]
    async fn update_field_materializes_missing_record() {
        let (lifecycle, _) = setup().await;
        let r = lifecycle
            .update_field(&admin(), "e2_2026_07", "loan_deduction", 1000.0)
            .await
            .unwrap();
        assert_eq!(r.basic_salary, Some(45000.0));
        assert_eq!(r.status, PayrollStatus::Pending);
        assert_eq!(r.net_payable_salary, 44000.0);

        // Generation afterwards keeps the materialized record.
        let report = lifecycle.generate(&admin(), 7, 2026).await.unwrap();
        assert_eq!(report.created, vec!["e1_2026_07"]);
        assert_eq!(lifecycle.get(&admin(), "e2_2026_07").await.unwrap().loan_deduction, 1000.0);
    }

    #[actix_web::test]
    async fn update_field_validates_field_id_and_employee() {
        let (lifecycle, _) = setup().await;
        assert!(matches!(
            lifecycle.update_field(&admin(), "e1_2026_06", "net_payable_salary", 1.0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            lifecycle.update_field(&admin(), "garbage", "ait", 1.0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            lifecycle.update_field(&admin(), "nobody_2026_06", "ait", 1.0).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            lifecycle.update_field(&staff("e1"), "e1_2026_06", "ait", 1.0).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[actix_web::test]
    async fn bulk_decide_reports_per_item() {
        let (lifecycle, _) = setup().await;
        lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        let before = lifecycle.get(&admin(), "e2_2026_06").await.unwrap();

        let ids = vec!["e1_2026_06".to_string(), "e2_2026_06".to_string(), "missing_2026_06".to_string()];
        let outcomes = lifecycle.bulk_decide(&admin(), &ids, PayrollAction::Reject).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].ok && outcomes[1].ok);
        assert_eq!(outcomes[0].status.as_deref(), Some("rejected"));
        assert!(!outcomes[2].ok);
        assert!(outcomes[2].error.is_some());

        let after = lifecycle.get(&admin(), "e2_2026_06").await.unwrap();
        assert_eq!(after.status, PayrollStatus::Rejected);
        assert_eq!(after.net_payable_salary, before.net_payable_salary);
        assert_eq!(after.decided_by.as_deref(), Some("u-admin"));
    }

    #[actix_web::test]
    async fn only_approved_records_can_be_paid() {
        let (lifecycle, _) = setup().await;
        lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        lifecycle
            .bulk_decide(&admin(), &["e1_2026_06".to_string()], PayrollAction::Approve)
            .await
            .unwrap();

        let outcomes = lifecycle
            .mark_paid(&admin(), &["e1_2026_06".to_string(), "e2_2026_06".to_string()])
            .await
            .unwrap();
        assert!(outcomes[0].ok);
        assert!(!outcomes[1].ok);

        assert!(matches!(
            lifecycle.update_field(&admin(), "e1_2026_06", "ait", 10.0).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn employees_see_only_their_own_records() {
        let (lifecycle, _) = setup().await;
        lifecycle.generate(&admin(), 6, 2026).await.unwrap();
        assert!(lifecycle.get(&staff("e1"), "e1_2026_06").await.is_ok());
        assert!(matches!(
            lifecycle.get(&staff("e1"), "e2_2026_06").await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
