use chrono::Utc;
use tracing::{info, warn};

use super::Actor;
use crate::error::{ServiceError, ServiceResult};
use crate::model::settings::{PayrollSettings, SettingEntry, SettingKey};
use crate::store::{self, SharedStore};

/// Tunable payroll constants, read fresh for every computation.
#[derive(Clone)]
pub struct SettingsService {
    store: SharedStore,
}

impl SettingsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> ServiceResult<PayrollSettings> {
        let entries: Vec<SettingEntry> = store::fetch_all(self.store.as_ref(), &[]).await?;

        let mut settings = PayrollSettings::default();
        for entry in entries {
            let Ok(key) = entry.key.parse::<SettingKey>() else {
                warn!(key = %entry.key, value = entry.value, "Ignoring unknown payroll setting");
                continue;
            };
            if let Err(e) = settings.apply(key, entry.value) {
                warn!(key = %entry.key, value = entry.value, error = %e, "Ignoring malformed payroll setting");
            }
        }

        settings
            .validate()
            .map_err(|e| ServiceError::validation(format!("stored payroll settings are invalid: {}", e)))?;
        Ok(settings)
    }

    pub async fn update(&self, actor: &Actor, key: &str, value: f64) -> ServiceResult<PayrollSettings> {
        actor.require_admin()?;

        let key: SettingKey = key
            .parse()
            .map_err(|_| ServiceError::validation(format!("unknown payroll setting: {}", key)))?;

        let mut settings = self.load().await?;
        settings.apply(key, value).map_err(ServiceError::Validation)?;
        settings.validate().map_err(ServiceError::Validation)?;

        let entry = SettingEntry {
            id: key.to_string(),
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        };
        store::save(self.store.as_ref(), &entry).await?;

        info!(key = %key, value, user_id = %actor.user_id, "Payroll setting updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::testing::{admin, staff};
    use crate::store::memory::MemoryDocumentStore;
    use crate::store::{Collection, DocumentStore};
    use serde_json::json;

    fn service() -> (SettingsService, SharedStore) {
        let store: SharedStore = Arc::new(MemoryDocumentStore::new());
        (SettingsService::new(store.clone()), store)
    }

    #[actix_web::test]
    async fn defaults_apply_when_nothing_is_stored() {
        let (svc, _) = service();
        assert_eq!(svc.load().await.unwrap(), PayrollSettings::default());
    }

    #[actix_web::test]
    async fn stored_entries_override_defaults() {
        let (svc, _) = service();
        svc.update(&admin(), "working_days_per_month", 26.0).await.unwrap();
        svc.update(&admin(), "late_tolerance_count", 4.0).await.unwrap();

        let settings = svc.load().await.unwrap();
        assert_eq!(settings.working_days_per_month, 26);
        assert_eq!(settings.late_tolerance_count, 4);
        assert_eq!(settings.annual_sick_leave_days, 14);
    }

    #[actix_web::test]
    async fn unknown_stored_keys_are_ignored() {
        let (svc, store) = service();
        store
            .upsert(
                Collection::PayrollSettings,
                "overtime_rate",
                json!({"key": "overtime_rate", "value": 1.5, "updated_at": "2026-01-01T00:00:00Z"}),
            )
            .await
            .unwrap();
        assert_eq!(svc.load().await.unwrap(), PayrollSettings::default());
    }

    #[actix_web::test]
    async fn updates_are_validated_and_admin_only() {
        let (svc, _) = service();
        assert!(matches!(
            svc.update(&staff("e1"), "working_days_per_month", 26.0).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.update(&admin(), "bonus_rate", 1.0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.update(&admin(), "late_tolerance_count", 0.0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.update(&admin(), "half_day_hours", 9.0).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(svc.load().await.unwrap(), PayrollSettings::default());
    }

    #[actix_web::test]
    async fn fractional_day_counts_are_rejected() {
        let (svc, store) = service();
        assert!(matches!(
            svc.update(&admin(), "working_days_per_month", 26.4).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(store
            .get(Collection::PayrollSettings, "working_days_per_month")
            .await
            .unwrap()
            .is_none());

        let settings = svc.update(&admin(), "half_day_hours", 4.5).await.unwrap();
        assert_eq!(settings.half_day_hours, 4.5);
    }

    #[actix_web::test]
    async fn malformed_stored_counts_are_ignored() {
        let (svc, store) = service();
        store
            .upsert(
                Collection::PayrollSettings,
                "working_days_per_month",
                json!({"key": "working_days_per_month", "value": 26.4, "updated_at": "2026-01-01T00:00:00Z"}),
            )
            .await
            .unwrap();
        assert_eq!(svc.load().await.unwrap().working_days_per_month, 30);
    }
}
