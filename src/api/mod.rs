pub mod attendance;
pub mod employee;
pub mod leave_request;
pub mod payroll;
pub mod settings;

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::service::aggregator::FactAggregator;
use crate::service::attendance::AttendanceService;
use crate::service::employee::EmployeeService;
use crate::service::leave_workflow::LeaveWorkflow;
use crate::service::office_hours::OfficeHoursPolicy;
use crate::service::payroll_lifecycle::PayrollLifecycle;
use crate::service::settings::SettingsService;
use crate::store::SharedStore;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub employees: EmployeeService,
    pub leave: LeaveWorkflow,
    pub attendance: AttendanceService,
    pub facts: FactAggregator,
    pub payroll: PayrollLifecycle,
    pub settings: SettingsService,
}

impl AppState {
    pub fn new(store: SharedStore, policy: Arc<dyn OfficeHoursPolicy>) -> Self {
        let settings = SettingsService::new(store.clone());
        let facts = FactAggregator::new(store.clone(), settings.clone(), policy.clone());

        Self {
            employees: EmployeeService::new(store.clone()),
            leave: LeaveWorkflow::new(store.clone()),
            attendance: AttendanceService::new(store.clone(), settings.clone(), policy),
            payroll: PayrollLifecycle::new(store, settings.clone(), facts.clone()),
            facts,
            settings,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "OK")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
