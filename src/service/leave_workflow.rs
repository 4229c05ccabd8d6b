use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use super::Actor;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::model::employee::Employee;
use crate::model::leave_request::{Decision, LeaveRequest, LeaveStatus, NewLeave};
use crate::store::{self, Entity, Filter, SharedStore};

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID
    pub employee_id: Option<String>,
    /// Filter by supervisor ID
    pub supervisor_id: Option<String>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
}

/// Submission, the supervisor → admin approval chain, and appeals.
#[derive(Clone)]
pub struct LeaveWorkflow {
    store: SharedStore,
}

impl LeaveWorkflow {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: &str) -> ServiceResult<LeaveRequest> {
        store::fetch_required(self.store.as_ref(), id).await
    }

    fn can_view(actor: &Actor, request: &LeaveRequest) -> bool {
        actor.require_hr_or_admin().is_ok()
            || actor.employee_id.as_deref() == Some(request.employee_id.as_str())
            || actor.employee_id.as_deref() == Some(request.supervisor_id.as_str())
    }

    pub async fn get(&self, actor: &Actor, id: &str) -> ServiceResult<LeaveRequest> {
        let request = self.load(id).await?;
        if !Self::can_view(actor, &request) {
            return Err(ServiceError::forbidden("Not allowed to view this leave request"));
        }
        Ok(request)
    }

    /// HR and admins see everything; others only their own or supervised requests.
    pub async fn list(&self, actor: &Actor, filter: &LeaveFilter) -> ServiceResult<Vec<LeaveRequest>> {
        let mut filters = Vec::new();
        if let Some(employee_id) = &filter.employee_id {
            filters.push(Filter::eq("employee_id", employee_id.as_str()));
        }
        if let Some(supervisor_id) = &filter.supervisor_id {
            filters.push(Filter::eq("supervisor_id", supervisor_id.as_str()));
        }
        if let Some(status) = filter.status {
            filters.push(Filter::eq("status", status.to_string()));
        }

        let mut requests: Vec<LeaveRequest> = store::fetch_all(self.store.as_ref(), &filters).await?;
        if actor.require_hr_or_admin().is_err() {
            requests.retain(|r| Self::can_view(actor, r));
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    pub async fn submit(&self, actor: &Actor, leave: NewLeave) -> ServiceResult<LeaveRequest> {
        let employee_id = actor.employee_id()?;
        let employee: Employee = store::fetch_required(self.store.as_ref(), employee_id).await?;
        let supervisor_id = employee.supervisor_id.clone().ok_or_else(|| {
            ServiceError::validation(format!("employee {} has no supervisor assigned", employee_id))
        })?;

        let mut request =
            LeaveRequest::submit(String::new(), employee.id.clone(), supervisor_id, leave, Utc::now())?;
        let data = serde_json::to_value(&request).map_err(StoreError::from)?;
        request.id = self.store.create(LeaveRequest::COLLECTION, data).await?;

        info!(
            leave_id = %request.id,
            employee_id,
            supervisor_id = %request.supervisor_id,
            leave_type = %request.leave_type,
            "Leave request submitted"
        );
        Ok(request)
    }

    pub async fn supervisor_decide(
        &self,
        actor: &Actor,
        id: &str,
        approve: bool,
        reason: Option<String>,
    ) -> ServiceResult<LeaveRequest> {
        let decision = Decision::from_parts(approve, reason)?;
        let mut request = self.load(id).await?;

        if actor.employee_id.as_deref() != Some(request.supervisor_id.as_str()) {
            return Err(ServiceError::forbidden("Only the assigned supervisor can decide this stage"));
        }

        if let Err(e) = request.decide_as_supervisor(decision, Utc::now()) {
            warn!(leave_id = %id, status = %request.status(), "Rejected supervisor decision");
            return Err(e);
        }
        store::save(self.store.as_ref(), &request).await?;

        info!(leave_id = %id, status = %request.status(), user_id = %actor.user_id, "Supervisor decided leave");
        Ok(request)
    }

    pub async fn admin_decide(
        &self,
        actor: &Actor,
        id: &str,
        approve: bool,
        reason: Option<String>,
    ) -> ServiceResult<LeaveRequest> {
        actor.require_admin()?;
        let decision = Decision::from_parts(approve, reason)?;
        let mut request = self.load(id).await?;

        if let Err(e) = request.decide_as_admin(decision, Utc::now()) {
            warn!(leave_id = %id, status = %request.status(), "Rejected admin decision");
            return Err(e);
        }
        store::save(self.store.as_ref(), &request).await?;

        info!(leave_id = %id, status = %request.status(), user_id = %actor.user_id, "Admin decided leave");
        Ok(request)
    }

    pub async fn appeal(&self, actor: &Actor, id: &str, message: &str) -> ServiceResult<LeaveRequest> {
        let mut request = self.load(id).await?;
        if actor.employee_id.as_deref() != Some(request.employee_id.as_str()) {
            return Err(ServiceError::forbidden("Only the requesting employee can appeal"));
        }

        request.appeal(message, Utc::now())?;
        store::save(self.store.as_ref(), &request).await?;

        info!(leave_id = %id, employee_id = %request.employee_id, "Leave rejection appealed");
        Ok(request)
    }

    pub async fn review_appeal(&self, actor: &Actor, id: &str) -> ServiceResult<LeaveRequest> {
        actor.require_admin()?;
        let mut request = self.load(id).await?;

        request.review_appeal(Utc::now())?;
        store::save(self.store.as_ref(), &request).await?;

        info!(leave_id = %id, user_id = %actor.user_id, "Leave appeal reviewed");
        Ok(request)
    }

    /// Badge count of unreviewed appeals visible to `actor`.
    pub async fn pending_appeal_count(&self, actor: &Actor) -> ServiceResult<usize> {
        let mut filters = vec![Filter::eq("status", LeaveStatus::Rejected.to_string())];
        if !actor.is_admin() {
            filters.push(Filter::eq("supervisor_id", actor.employee_id()?));
        }

        let rejected: Vec<LeaveRequest> = store::fetch_all(self.store.as_ref(), &filters).await?;
        Ok(rejected.iter().filter(|r| r.has_pending_appeal()).count())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::model::leave_request::{LeaveType, RejectedBy};
    use crate::service::testing::{admin, employee, staff};
    use crate::store::memory::MemoryDocumentStore;

    async fn setup() -> LeaveWorkflow {
        let store: SharedStore = Arc::new(MemoryDocumentStore::new());
        let mut boss = employee("s1", None, Some(80000.0));
        boss.is_supervisor = true;
        store::save(store.as_ref(), &boss).await.unwrap();
        store::save(store.as_ref(), &employee("e1", Some("s1"), Some(30000.0)))
            .await
            .unwrap();
        store::save(store.as_ref(), &employee("e2", None, Some(30000.0)))
            .await
            .unwrap();
        LeaveWorkflow::new(store)
    }

    fn new_leave() -> NewLeave {
        NewLeave {
            leave_type: LeaveType::Sick,
            start_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 5).unwrap(),
            reason: "fever".into(),
            document_ref: Some("uploads/medical-note.pdf".into()),
        }
    }

    #[actix_web::test]
    async fn submit_denormalizes_supervisor() {
        let wf = setup().await;
        let req = wf.submit(&staff("e1"), new_leave()).await.unwrap();
        assert_eq!(req.supervisor_id, "s1");
        assert_eq!(req.status(), LeaveStatus::PendingSupervisor);
        assert!(!req.id.is_empty());
        assert_eq!(wf.get(&admin(), &req.id).await.unwrap(), req);
    }

    #[actix_web::test]
    async fn submit_requires_a_supervisor() {
        let wf = setup().await;
        let err = wf.submit(&staff("e2"), new_leave()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn two_stage_approval() {
        let wf = setup().await;
        let req = wf.submit(&staff("e1"), new_leave()).await.unwrap();

        let req = wf.supervisor_decide(&staff("s1"), &req.id, true, None).await.unwrap();
        assert_eq!(req.status(), LeaveStatus::PendingAdmin);

        let req = wf.admin_decide(&admin(), &req.id, true, None).await.unwrap();
        assert_eq!(req.status(), LeaveStatus::Approved);
        assert_eq!(req.supervisor_approved(), Some(true));
        assert_eq!(req.admin_approved(), Some(true));
    }

    #[actix_web::test]
    async fn admin_decision_before_supervisor_leaves_record_unchanged() {
        let wf = setup().await;
        let req = wf.submit(&staff("e1"), new_leave()).await.unwrap();

        let err = wf.admin_decide(&admin(), &req.id, true, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(wf.get(&admin(), &req.id).await.unwrap(), req);
    }

    #[actix_web::test]
    async fn only_assigned_supervisor_and_admin_may_decide() {
        let wf = setup().await;
        let req = wf.submit(&staff("e1"), new_leave()).await.unwrap();

        assert!(matches!(
            wf.supervisor_decide(&staff("e2"), &req.id, true, None).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            wf.supervisor_decide(&staff("e1"), &req.id, true, None).await,
            Err(ServiceError::Forbidden(_))
        ));

        wf.supervisor_decide(&staff("s1"), &req.id, true, None).await.unwrap();
        assert!(matches!(
            wf.admin_decide(&staff("s1"), &req.id, true, None).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[actix_web::test]
    async fn rejection_requires_reason() {
        let wf = setup().await;
        let req = wf.submit(&staff("e1"), new_leave()).await.unwrap();
        assert!(matches!(
            wf.supervisor_decide(&staff("s1"), &req.id, false, None).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(
            wf.get(&admin(), &req.id).await.unwrap().status(),
            LeaveStatus::PendingSupervisor
        );
    }

    #[actix_web::test]
    async fn rejected_then_appealed_then_reviewed() {
        let wf = setup().await;
        let req = wf.submit(&staff("e1"), new_leave()).await.unwrap();
        let req = wf
            .supervisor_decide(&staff("s1"), &req.id, false, Some("release week".into()))
            .await
            .unwrap();
        assert_eq!(req.rejected_by, Some(RejectedBy::Supervisor));
        assert_eq!(wf.pending_appeal_count(&staff("s1")).await.unwrap(), 0);

        assert!(matches!(
            wf.appeal(&staff("e2"), &req.id, "not mine").await,
            Err(ServiceError::Forbidden(_))
        ));
        let req = wf.appeal(&staff("e1"), &req.id, "doctor's note attached").await.unwrap();
        assert_eq!(req.status(), LeaveStatus::Rejected);
        assert!(!req.appeal_reviewed);

        assert_eq!(wf.pending_appeal_count(&staff("s1")).await.unwrap(), 1);
        assert_eq!(wf.pending_appeal_count(&admin()).await.unwrap(), 1);
        assert_eq!(wf.pending_appeal_count(&staff("e2")).await.unwrap(), 0);

        // Reading the request again must not mark the appeal reviewed.
        assert!(!wf.get(&admin(), &req.id).await.unwrap().appeal_reviewed);

        let req = wf.review_appeal(&admin(), &req.id).await.unwrap();
        assert!(req.appeal_reviewed);
        assert_eq!(req.status(), LeaveStatus::Rejected);
        assert_eq!(wf.pending_appeal_count(&admin()).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn listing_is_scoped_for_staff() {
        let wf = setup().await;
        wf.submit(&staff("e1"), new_leave()).await.unwrap();

        assert_eq!(wf.list(&admin(), &LeaveFilter::default()).await.unwrap().len(), 1);
        assert_eq!(wf.list(&staff("s1"), &LeaveFilter::default()).await.unwrap().len(), 1);
        assert_eq!(wf.list(&staff("e2"), &LeaveFilter::default()).await.unwrap().len(), 0);

        let pending = LeaveFilter {
            status: Some(LeaveStatus::PendingAdmin),
            ..LeaveFilter::default()
        };
        assert!(wf.list(&admin(), &pending).await.unwrap().is_empty());
    }
}
