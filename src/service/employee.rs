use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::Actor;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::model::employee::{Employee, EmployeeStatus};
use crate::store::{self, Entity, Filter, SharedStore};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewEmployee {
    #[schema(example = "Farhana Akter")]
    pub name: String,
    #[schema(example = "farhana@company.com")]
    pub email: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub is_supervisor: bool,
    #[schema(example = 30000.0)]
    pub gross_salary: Option<f64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub joined_on: Option<NaiveDate>,
}

/// Partial edit. An empty `supervisor_id` clears the relation.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub supervisor_id: Option<String>,
    pub is_supervisor: Option<bool>,
    pub gross_salary: Option<f64>,
    pub status: Option<EmployeeStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeFilter {
    pub status: Option<EmployeeStatus>,
    pub department: Option<String>,
}

#[derive(Clone)]
pub struct EmployeeService {
    store: SharedStore,
}

fn validate_contact(name: &str, email: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::validation("name is required"));
    }
    if !email.contains('@') {
        return Err(ServiceError::validation("a valid email is required"));
    }
    Ok(())
}

fn validate_salary(salary: Option<f64>) -> ServiceResult<()> {
    match salary {
        Some(s) if !s.is_finite() || s < 0.0 => {
            Err(ServiceError::validation("gross_salary must be a non-negative number"))
        }
        _ => Ok(()),
    }
}

impl EmployeeService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Employee> {
        store::fetch_required(self.store.as_ref(), id).await
    }

    pub async fn list(&self, filter: &EmployeeFilter) -> ServiceResult<Vec<Employee>> {
        let mut filters = Vec::new();
        if let Some(status) = filter.status {
            filters.push(Filter::eq("status", status.to_string()));
        }
        if let Some(department) = &filter.department {
            filters.push(Filter::eq("department", department.as_str()));
        }
        store::fetch_all(self.store.as_ref(), &filters).await
    }

    async fn check_supervisor(&self, employee_id: Option<&str>, supervisor_id: &str) -> ServiceResult<()> {
        if employee_id == Some(supervisor_id) {
            return Err(ServiceError::validation("an employee cannot supervise themself"));
        }
        let supervisor: Employee = store::fetch(self.store.as_ref(), supervisor_id)
            .await?
            .ok_or_else(|| ServiceError::validation(format!("supervisor {} does not exist", supervisor_id)))?;
        if !supervisor.is_supervisor {
            return Err(ServiceError::validation(format!(
                "employee {} is not flagged as a supervisor",
                supervisor_id
            )));
        }
        Ok(())
    }

    pub async fn create(&self, actor: &Actor, new: NewEmployee) -> ServiceResult<Employee> {
        actor.require_hr_or_admin()?;
        validate_contact(&new.name, &new.email)?;
        validate_salary(new.gross_salary)?;
        if let Some(supervisor_id) = new.supervisor_id.as_deref() {
            self.check_supervisor(None, supervisor_id).await?;
        }

        let now = Utc::now();
        let mut employee = Employee {
            id: String::new(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_lowercase(),
            department: new.department,
            designation: new.designation,
            supervisor_id: new.supervisor_id,
            is_supervisor: new.is_supervisor,
            gross_salary: new.gross_salary,
            status: EmployeeStatus::Active,
            joined_on: new.joined_on,
            created_at: now,
            updated_at: now,
        };

        let data = serde_json::to_value(&employee).map_err(StoreError::from)?;
        employee.id = self.store.create(Employee::COLLECTION, data).await?;

        info!(employee_id = %employee.id, user_id = %actor.user_id, "Employee created");
        Ok(employee)
    }

    pub async fn update(&self, actor: &Actor, id: &str, update: EmployeeUpdate) -> ServiceResult<Employee> {
        actor.require_hr_or_admin()?;
        let mut employee = self.get(id).await?;

        if let Some(name) = update.name {
            employee.name = name.trim().to_string();
        }
        if let Some(email) = update.email {
            employee.email = email.trim().to_lowercase();
        }
        validate_contact(&employee.name, &employee.email)?;

        if update.department.is_some() {
            employee.department = update.department;
        }
        if update.designation.is_some() {
            employee.designation = update.designation;
        }
        if let Some(salary) = update.gross_salary {
            validate_salary(Some(salary))?;
            employee.gross_salary = Some(salary);
        }
        if let Some(flag) = update.is_supervisor {
            employee.is_supervisor = flag;
        }
        if let Some(status) = update.status {
            employee.status = status;
        }
        match update.supervisor_id.as_deref() {
            Some("") => employee.supervisor_id = None,
            Some(supervisor_id) => {
                self.check_supervisor(Some(id), supervisor_id).await?;
                employee.supervisor_id = Some(supervisor_id.to_string());
            }
            None => {}
        }

        employee.updated_at = Utc::now();
        store::save(self.store.as_ref(), &employee).await?;

        info!(employee_id = %id, user_id = %actor.user_id, "Employee updated");
        Ok(employee)
    }

    pub async fn set_status(&self, actor: &Actor, id: &str, status: EmployeeStatus) -> ServiceResult<Employee> {
        actor.require_hr_or_admin()?;

        let partial = json!({ "status": status, "updated_at": Utc::now() });
        if !self.store.update(Employee::COLLECTION, id, partial).await? {
            return Err(ServiceError::not_found(format!("employee {} not found", id)));
        }

        info!(employee_id = %id, status = %status, user_id = %actor.user_id, "Employee status changed");
        self.get(id).await
    }

    /// Hard delete. Revoking login access is the auth system's concern.
    pub async fn delete(&self, actor: &Actor, id: &str) -> ServiceResult<()> {
        actor.require_admin()?;
        if !self.store.delete(Employee::COLLECTION, id).await? {
            return Err(ServiceError::not_found(format!("employee {} not found", id)));
        }
        info!(employee_id = %id, user_id = %actor.user_id, "Employee deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::testing::{admin, staff};
    use crate::store::memory::MemoryDocumentStore;

    fn service() -> EmployeeService {
        EmployeeService::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn new_employee(name: &str, supervisor: Option<&str>, is_supervisor: bool) -> NewEmployee {
        NewEmployee {
            name: name.into(),
            email: format!("{}@company.com", name.to_lowercase()),
            department: Some("Finance".into()),
            designation: None,
            supervisor_id: supervisor.map(str::to_string),
            is_supervisor,
            gross_salary: Some(40000.0),
            joined_on: None,
        }
    }

    #[actix_web::test]
    async fn create_and_assign_supervisor() {
        let svc = service();
        let boss = svc.create(&admin(), new_employee("Mahmud", None, true)).await.unwrap();
        let worker = svc
            .create(&admin(), new_employee("Rumana", Some(&boss.id), false))
            .await
            .unwrap();

        let stored = svc.get(&worker.id).await.unwrap();
        assert_eq!(stored.supervisor_id.as_deref(), Some(boss.id.as_str()));
        assert_eq!(stored.status, EmployeeStatus::Active);
    }

    #[actix_web::test]
    async fn supervisor_must_be_flagged() {
        let svc = service();
        let peer = svc.create(&admin(), new_employee("Jamal", None, false)).await.unwrap();
        let err = svc
            .create(&admin(), new_employee("Rina", Some(&peer.id), false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn cannot_supervise_self() {
        let svc = service();
        let boss = svc.create(&admin(), new_employee("Mahmud", None, true)).await.unwrap();
        let err = svc
            .update(
                &admin(),
                &boss.id,
                EmployeeUpdate {
                    supervisor_id: Some(boss.id.clone()),
                    ..EmployeeUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn status_changes_and_filtering() {
        let svc = service();
        let a = svc.create(&admin(), new_employee("Alif", None, false)).await.unwrap();
        svc.create(&admin(), new_employee("Bushra", None, false)).await.unwrap();
        svc.set_status(&admin(), &a.id, EmployeeStatus::Terminated).await.unwrap();

        let active = svc
            .list(&EmployeeFilter {
                status: Some(EmployeeStatus::Active),
                department: None,
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Bushra");
    }

    #[actix_web::test]
    async fn staff_cannot_administer_employees() {
        let svc = service();
        let err = svc
            .create(&staff("e1"), new_employee("Alif", None, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[actix_web::test]
    async fn delete_reports_missing_employee() {
        let svc = service();
        let a = svc.create(&admin(), new_employee("Alif", None, false)).await.unwrap();
        svc.delete(&admin(), &a.id).await.unwrap();
        assert!(matches!(svc.get(&a.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(&admin(), &a.id).await, Err(ServiceError::NotFound(_))));
    }
}
