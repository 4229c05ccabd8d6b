//! Leave requests and their two-stage approval state machine.
//!
//! `status`, `supervisor_approved` and `admin_approved` are private: the
//! transition methods below are the only writers, and every stored document
//! is checked on load so that `status` always agrees with the approval pair.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Collection, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Casual,
    Sick,
    Unpaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    PendingSupervisor,
    PendingAdmin,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// The only status consistent with an approval pair, if any.
    pub fn derive(supervisor_approved: Option<bool>, admin_approved: Option<bool>) -> Option<Self> {
        match (supervisor_approved, admin_approved) {
            (None, None) => Some(LeaveStatus::PendingSupervisor),
            (Some(true), None) => Some(LeaveStatus::PendingAdmin),
            (Some(true), Some(true)) => Some(LeaveStatus::Approved),
            (Some(false), None) | (Some(true), Some(false)) => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RejectedBy {
    Supervisor,
    Admin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    /// Rejecting requires a non-blank reason.
    pub fn from_parts(approve: bool, reason: Option<String>) -> ServiceResult<Self> {
        if approve {
            return Ok(Decision::Approve);
        }
        match reason.map(|r| r.trim().to_string()) {
            Some(reason) if !reason.is_empty() => Ok(Decision::Reject { reason }),
            _ => Err(ServiceError::validation("a rejection reason is required")),
        }
    }
}

/// Submission payload before an id and supervisor are attached.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeave {
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family event")]
    pub reason: String,
    /// Reference to an uploaded supporting document.
    #[serde(default)]
    pub document_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    pub id: String,
    pub employee_id: String,
    pub supervisor_id: String,
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub document_ref: Option<String>,
    status: LeaveStatus,
    #[serde(default)]
    supervisor_approved: Option<bool>,
    #[serde(default)]
    admin_approved: Option<bool>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rejected_by: Option<RejectedBy>,
    #[serde(default)]
    pub appeal_message: Option<String>,
    #[serde(default)]
    pub appeal_reviewed: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for LeaveRequest {
    const COLLECTION: Collection = Collection::LeaveRequests;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        if self.start_date > self.end_date {
            return Err("start_date is after end_date".into());
        }
        match LeaveStatus::derive(self.supervisor_approved, self.admin_approved) {
            Some(status) if status == self.status => {}
            _ => {
                return Err(format!(
                    "status {} contradicts approvals ({:?}, {:?})",
                    self.status, self.supervisor_approved, self.admin_approved
                ));
            }
        }
        if self.status == LeaveStatus::Rejected {
            if self.rejection_reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
                return Err("rejected request has no rejection reason".into());
            }
            let expected = if self.supervisor_approved == Some(false) {
                RejectedBy::Supervisor
            } else {
                RejectedBy::Admin
            };
            if self.rejected_by != Some(expected) {
                return Err("rejected_by does not match the rejecting stage".into());
            }
        }
        Ok(())
    }
}

impl LeaveRequest {
    pub fn submit(
        id: String,
        employee_id: String,
        supervisor_id: String,
        leave: NewLeave,
        now: DateTime<Utc>,
    ) -> ServiceResult<Self> {
        if leave.start_date > leave.end_date {
            return Err(ServiceError::validation("start_date cannot be after end_date"));
        }
        if leave.reason.trim().is_empty() {
            return Err(ServiceError::validation("a leave reason is required"));
        }

        Ok(Self {
            id,
            employee_id,
            supervisor_id,
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason.trim().to_string(),
            document_ref: leave.document_ref,
            status: LeaveStatus::PendingSupervisor,
            supervisor_approved: None,
            admin_approved: None,
            rejection_reason: None,
            rejected_by: None,
            appeal_message: None,
            appeal_reviewed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status(&self) -> LeaveStatus {
        self.status
    }

    pub fn supervisor_approved(&self) -> Option<bool> {
        self.supervisor_approved
    }

    pub fn admin_approved(&self) -> Option<bool> {
        self.admin_approved
    }

    fn expect_status(&self, expected: LeaveStatus) -> ServiceResult<()> {
        if self.status != expected {
            return Err(ServiceError::validation(format!(
                "invalid transition: leave request {} is {}, expected {}",
                self.id, self.status, expected
            )));
        }
        Ok(())
    }

    fn reject(&mut self, by: RejectedBy, reason: String) {
        self.status = LeaveStatus::Rejected;
        self.rejected_by = Some(by);
        self.rejection_reason = Some(reason);
    }

    /// Stage one. Leaves the request untouched on error.
    pub fn decide_as_supervisor(&mut self, decision: Decision, now: DateTime<Utc>) -> ServiceResult<()> {
        self.expect_status(LeaveStatus::PendingSupervisor)?;
        match decision {
            Decision::Approve => {
                self.supervisor_approved = Some(true);
                self.status = LeaveStatus::PendingAdmin;
            }
            Decision::Reject { reason } => {
                self.supervisor_approved = Some(false);
                self.reject(RejectedBy::Supervisor, reason);
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// Stage two. Leaves the request untouched on error.
    pub fn decide_as_admin(&mut self, decision: Decision, now: DateTime<Utc>) -> ServiceResult<()> {
        self.expect_status(LeaveStatus::PendingAdmin)?;
        match decision {
            Decision::Approve => {
                self.admin_approved = Some(true);
                self.status = LeaveStatus::Approved;
            }
            Decision::Reject { reason } => {
                self.admin_approved = Some(false);
                self.reject(RejectedBy::Admin, reason);
            }
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn has_pending_appeal(&self) -> bool {
        self.status == LeaveStatus::Rejected && self.appeal_message.is_some() && !self.appeal_reviewed
    }

    /// Files an appeal against a rejection. Status stays `rejected`.
    pub fn appeal(&mut self, message: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        self.expect_status(LeaveStatus::Rejected)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ServiceError::validation("an appeal message is required"));
        }
        if self.has_pending_appeal() {
            return Err(ServiceError::validation(format!(
                "leave request {} already has an appeal awaiting review",
                self.id
            )));
        }
        self.appeal_message = Some(message.to_string());
        self.appeal_reviewed = false;
        self.updated_at = now;
        Ok(())
    }

    pub fn review_appeal(&mut self, now: DateTime<Utc>) -> ServiceResult<()> {
        if !self.has_pending_appeal() {
            return Err(ServiceError::validation(format!(
                "leave request {} has no appeal awaiting review",
                self.id
            )));
        }
        self.appeal_reviewed = true;
        self.updated_at = now;
        Ok(())
    }
}
