//! Employee domain: entity, validation, and use cases.
//!
//! An employee ties a user to a company under a company-scoped employee
//! code. Reads return the referenced user as a joined value snapshot rather
//! than requiring a second lookup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::users::UserStatus;
use crate::services::clock::Clock;
use crate::services::db::TxContext;
use crate::services::page::{self, Page, PageError};
use crate::services::tx::{TxError, TxManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(EmployeeStatus::Active),
            "inactive" => Some(EmployeeStatus::Inactive),
            _ => None,
        }
    }
}

/// Value snapshot of the referenced user row, joined at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSnapshot {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_code: String,
    pub user_id: Uuid,
    pub status: EmployeeStatus,
    pub hired_at: Option<NaiveDate>,
    pub terminated_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSnapshot,
}

/// Fields for an employee row that does not exist yet; the id is assigned by
/// the database.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub company_id: Uuid,
    pub employee_code: String,
    pub user_id: Uuid,
    pub status: EmployeeStatus,
    pub hired_at: Option<NaiveDate>,
    pub terminated_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum EmployeeError {
    #[error("employee not found")]
    NotFound,
    #[error("company not found")]
    CompanyNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("employee code already exists")]
    CodeAlreadyExists,
    #[error("invalid id")]
    InvalidId,
    #[error("invalid company id")]
    InvalidCompanyId,
    #[error("invalid user id")]
    InvalidUserId,
    #[error("invalid employee code")]
    InvalidCode,
    #[error("invalid status")]
    InvalidStatus,
    #[error("invalid employment period")]
    InvalidEmploymentPeriod,
    #[error("invalid page size")]
    InvalidPageSize,
    #[error("invalid page token")]
    InvalidPageToken,
    #[error(transparent)]
    Transaction(#[from] TxError),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<PageError> for EmployeeError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::InvalidPageSize => EmployeeError::InvalidPageSize,
            PageError::InvalidPageToken => EmployeeError::InvalidPageToken,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListEmployeesFilter {
    pub company_id: Uuid,
    pub status: Option<EmployeeStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn create(
        &self,
        ctx: &TxContext,
        employee: NewEmployee,
    ) -> Result<Employee, EmployeeError>;
    async fn update(
        &self,
        ctx: &TxContext,
        employee: &Employee,
    ) -> Result<Employee, EmployeeError>;
    async fn delete(&self, ctx: &TxContext, id: Uuid) -> Result<(), EmployeeError>;
    async fn find_by_id(&self, ctx: &TxContext, id: Uuid) -> Result<Employee, EmployeeError>;
    async fn find_by_company_and_code(
        &self,
        ctx: &TxContext,
        company_id: Uuid,
        employee_code: &str,
    ) -> Result<Option<Employee>, EmployeeError>;
    async fn list(
        &self,
        ctx: &TxContext,
        filter: ListEmployeesFilter,
    ) -> Result<Page<Employee>, EmployeeError>;
}

#[derive(Debug, Clone)]
pub struct CreateEmployeeInput {
    pub company_id: String,
    pub employee_code: String,
    pub user_id: String,
    pub status: Option<String>,
    pub hired_at: Option<NaiveDate>,
    pub terminated_at: Option<NaiveDate>,
}

/// Dates use two `Option` layers: the outer layer is "was the field sent",
/// the inner layer is the new value, `None` meaning an explicit clear.
#[derive(Debug, Clone, Default)]
pub struct UpdateEmployeeInput {
    pub id: String,
    pub employee_code: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub hired_at: Option<Option<NaiveDate>>,
    pub terminated_at: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListEmployeesInput {
    pub company_id: String,
    pub page_size: i32,
    pub page_token: String,
    pub status: Option<String>,
}

/// Employee use cases.
#[derive(Clone)]
pub struct EmployeeService {
    repo: Arc<dyn EmployeeRepository>,
    clock: Arc<dyn Clock>,
    tx: TxManager,
}

impl EmployeeService {
    pub fn new(repo: Arc<dyn EmployeeRepository>, clock: Arc<dyn Clock>, tx: TxManager) -> Self {
        Self { repo, clock, tx }
    }

    pub async fn create_employee(
        &self,
        ctx: &TxContext,
        input: CreateEmployeeInput,
    ) -> Result<Employee, EmployeeError> {
        let company_id = parse_company_id(&input.company_id)?;
        let employee_code = normalize_employee_code(&input.employee_code)?;
        let user_id = parse_user_id(&input.user_id)?;
        validate_employment_period(input.hired_at, input.terminated_at)?;

        let status = match input.status.as_deref() {
            None => EmployeeStatus::Active,
            Some(raw) => {
                EmployeeStatus::parse(raw.trim()).ok_or(EmployeeError::InvalidStatus)?
            }
        };

        let hired_at = input.hired_at;
        let terminated_at = input.terminated_at;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move {
                    ensure_code_not_exists(self.repo.as_ref(), &txctx, company_id, &employee_code)
                        .await?;

                    let now = self.clock.now();
                    self.repo
                        .create(
                            &txctx,
                            NewEmployee {
                                company_id,
                                employee_code,
                                user_id,
                                status,
                                hired_at,
                                terminated_at,
                                created_at: now,
                                updated_at: now,
                            },
                        )
                        .await
                })
            })
            .await
    }

    pub async fn get_employee(
        &self,
        ctx: &TxContext,
        id: &str,
    ) -> Result<Employee, EmployeeError> {
        let id = parse_id(id)?;

        self.tx
            .within_read_only(ctx, move |txctx| {
                Box::pin(async move { self.repo.find_by_id(&txctx, id).await })
            })
            .await
    }

    pub async fn list_employees(
        &self,
        ctx: &TxContext,
        input: ListEmployeesInput,
    ) -> Result<Page<Employee>, EmployeeError> {
        let company_id = parse_company_id(&input.company_id)?;
        let limit = page::normalize_page_size(input.page_size)?;
        let offset = page::parse_page_token(&input.page_token)?;
        let status = parse_status_filter(input.status.as_deref())?;

        self.tx
            .within_read_only(ctx, move |txctx| {
                Box::pin(async move {
                    self.repo
                        .list(
                            &txctx,
                            ListEmployeesFilter {
                                company_id,
                                status,
                                limit,
                                offset,
                            },
                        )
                        .await
                })
            })
            .await
    }

    pub async fn update_employee(
        &self,
        ctx: &TxContext,
        input: UpdateEmployeeInput,
    ) -> Result<Employee, EmployeeError> {
        let id = parse_id(&input.id)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move {
                    let mut existing = self.repo.find_by_id(&txctx, id).await?;

                    if let Some(code) = &input.employee_code {
                        let code = normalize_employee_code(code)?;
                        if code != existing.employee_code {
                            ensure_code_not_exists(
                                self.repo.as_ref(),
                                &txctx,
                                existing.company_id,
                                &code,
                            )
                            .await?;
                            existing.employee_code = code;
                        }
                    }

                    if let Some(user_id) = &input.user_id {
                        existing.user_id = parse_user_id(user_id)?;
                    }

                    if let Some(status) = &input.status {
                        existing.status = EmployeeStatus::parse(status.trim())
                            .ok_or(EmployeeError::InvalidStatus)?;
                    }

                    if let Some(hired_at) = input.hired_at {
                        existing.hired_at = hired_at;
                    }

                    if let Some(terminated_at) = input.terminated_at {
                        existing.terminated_at = terminated_at;
                    }

                    validate_employment_period(existing.hired_at, existing.terminated_at)?;

                    existing.updated_at = self.clock.now();
                    self.repo.update(&txctx, &existing).await
                })
            })
            .await
    }

    pub async fn delete_employee(&self, ctx: &TxContext, id: &str) -> Result<(), EmployeeError> {
        let id = parse_id(id)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move { self.repo.delete(&txctx, id).await })
            })
            .await
    }
}

async fn ensure_code_not_exists(
    repo: &dyn EmployeeRepository,
    ctx: &TxContext,
    company_id: Uuid,
    employee_code: &str,
) -> Result<(), EmployeeError> {
    if repo
        .find_by_company_and_code(ctx, company_id, employee_code)
        .await?
        .is_some()
    {
        return Err(EmployeeError::CodeAlreadyExists);
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid, EmployeeError> {
    parse_uuid(raw).ok_or(EmployeeError::InvalidId)
}

fn parse_company_id(raw: &str) -> Result<Uuid, EmployeeError> {
    parse_uuid(raw).ok_or(EmployeeError::InvalidCompanyId)
}

fn parse_user_id(raw: &str) -> Result<Uuid, EmployeeError> {
    parse_uuid(raw).ok_or(EmployeeError::InvalidUserId)
}

fn parse_uuid(raw: &str) -> Option<Uuid> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Uuid::parse_str(trimmed).ok()
}

fn normalize_employee_code(raw: &str) -> Result<String, EmployeeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EmployeeError::InvalidCode);
    }
    let lower = trimmed.to_lowercase();
    if !super::companies::code_matches(&lower) {
        return Err(EmployeeError::InvalidCode);
    }
    Ok(lower)
}

fn validate_employment_period(
    hired_at: Option<NaiveDate>,
    terminated_at: Option<NaiveDate>,
) -> Result<(), EmployeeError> {
    if let (Some(hired), Some(terminated)) = (hired_at, terminated_at) {
        if terminated < hired {
            return Err(EmployeeError::InvalidEmploymentPeriod);
        }
    }
    Ok(())
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<EmployeeStatus>, EmployeeError> {
    match raw {
        None => Ok(None),
        Some(s) => EmployeeStatus::parse(s.trim())
            .map(Some)
            .ok_or(EmployeeError::InvalidStatus),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use chrono::{Duration, TimeZone};

    use crate::services::clock::FixedClock;
    use crate::services::page;

    use super::*;

    /// Fake repository that also emulates the two foreign keys: creates and
    /// updates referencing an unknown company or user fail the same way the
    /// real constraint translation does.
    struct FakeEmployeeRepo {
        employees: Mutex<Vec<Employee>>,
        companies: Mutex<HashSet<Uuid>>,
        users: Mutex<HashMap<Uuid, UserSnapshot>>,
    }

    impl FakeEmployeeRepo {
        fn new() -> Self {
            Self {
                employees: Mutex::new(Vec::new()),
                companies: Mutex::new(HashSet::new()),
                users: Mutex::new(HashMap::new()),
            }
        }

        fn add_company(&self) -> Uuid {
            let id = Uuid::new_v4();
            self.companies.lock().unwrap().insert(id);
            id
        }

        fn add_user(&self, email: &str) -> Uuid {
            let id = Uuid::new_v4();
            let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
            self.users.lock().unwrap().insert(
                id,
                UserSnapshot {
                    id,
                    email: email.to_string(),
                    name: email.to_string(),
                    status: UserStatus::Active,
                    created_at: now,
                    updated_at: now,
                },
            );
            id
        }

        fn snapshot(&self, user_id: Uuid) -> Result<UserSnapshot, EmployeeError> {
            self.users
                .lock()
                .unwrap()
                .get(&user_id)
                .cloned()
                .ok_or(EmployeeError::UserNotFound)
        }
    }

    #[async_trait]
    impl EmployeeRepository for FakeEmployeeRepo {
        async fn create(
            &self,
            _ctx: &TxContext,
            employee: NewEmployee,
        ) -> Result<Employee, EmployeeError> {
            if !self.companies.lock().unwrap().contains(&employee.company_id) {
                return Err(EmployeeError::CompanyNotFound);
            }
            let user = self.snapshot(employee.user_id)?;
            let mut employees = self.employees.lock().unwrap();
            if employees.iter().any(|e| {
                e.company_id == employee.company_id && e.employee_code == employee.employee_code
            }) {
                return Err(EmployeeError::CodeAlreadyExists);
            }
            let created = Employee {
                id: Uuid::new_v4(),
                company_id: employee.company_id,
                employee_code: employee.employee_code,
                user_id: employee.user_id,
                status: employee.status,
                hired_at: employee.hired_at,
                terminated_at: employee.terminated_at,
                created_at: employee.created_at,
                updated_at: employee.updated_at,
                user,
            };
            employees.push(created.clone());
            Ok(created)
        }

        async fn update(
            &self,
            _ctx: &TxContext,
            employee: &Employee,
        ) -> Result<Employee, EmployeeError> {
            let user = self.snapshot(employee.user_id)?;
            let mut employees = self.employees.lock().unwrap();
            let existing = employees
                .iter_mut()
                .find(|e| e.id == employee.id)
                .ok_or(EmployeeError::NotFound)?;
            *existing = Employee {
                user,
                ..employee.clone()
            };
            Ok(existing.clone())
        }

        async fn delete(&self, _ctx: &TxContext, id: Uuid) -> Result<(), EmployeeError> {
            let mut employees = self.employees.lock().unwrap();
            let before = employees.len();
            employees.retain(|e| e.id != id);
            if employees.len() == before {
                return Err(EmployeeError::NotFound);
            }
            Ok(())
        }

        async fn find_by_id(&self, _ctx: &TxContext, id: Uuid) -> Result<Employee, EmployeeError> {
            let employees = self.employees.lock().unwrap();
            employees
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or(EmployeeError::NotFound)
        }

        async fn find_by_company_and_code(
            &self,
            _ctx: &TxContext,
            company_id: Uuid,
            employee_code: &str,
        ) -> Result<Option<Employee>, EmployeeError> {
            let employees = self.employees.lock().unwrap();
            Ok(employees
                .iter()
                .find(|e| e.company_id == company_id && e.employee_code == employee_code)
                .cloned())
        }

        async fn list(
            &self,
            _ctx: &TxContext,
            filter: ListEmployeesFilter,
        ) -> Result<Page<Employee>, EmployeeError> {
            page::check_window(filter.limit, filter.offset)?;
            let employees = self.employees.lock().unwrap();
            let mut matching: Vec<Employee> = employees
                .iter()
                .filter(|e| e.company_id == filter.company_id)
                .filter(|e| filter.status.is_none_or(|s| e.status == s))
                .cloned()
                .collect();
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let window: Vec<Employee> = matching
                .into_iter()
                .skip(filter.offset as usize)
                .take(filter.limit as usize + 1)
                .collect();
            Ok(page::paginate(window, filter.limit, filter.offset))
        }
    }

    struct Fixture {
        svc: EmployeeService,
        repo: Arc<FakeEmployeeRepo>,
        clock: Arc<FixedClock>,
        company_id: Uuid,
        user_id: Uuid,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(FakeEmployeeRepo::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let company_id = repo.add_company();
        let user_id = repo.add_user("worker@example.com");
        let svc = EmployeeService::new(repo.clone(), clock.clone(), TxManager::noop());
        Fixture {
            svc,
            repo,
            clock,
            company_id,
            user_id,
        }
    }

    fn create_input(f: &Fixture, code: &str) -> CreateEmployeeInput {
        CreateEmployeeInput {
            company_id: f.company_id.to_string(),
            employee_code: code.into(),
            user_id: f.user_id.to_string(),
            status: None,
            hired_at: None,
            terminated_at: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn create_employee_joins_the_user_snapshot() {
        let f = fixture();
        let ctx = TxContext::new();

        let created = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    employee_code: " EMP-001 ".into(),
                    hired_at: Some(date(2025, 1, 6)),
                    ..create_input(&f, "ignored")
                },
            )
            .await
            .expect("create succeeds");

        assert_eq!(created.employee_code, "emp-001");
        assert_eq!(created.status, EmployeeStatus::Active);
        assert_eq!(created.user.id, f.user_id);
        assert_eq!(created.user.email, "worker@example.com");
        assert_eq!(created.hired_at, Some(date(2025, 1, 6)));
        assert_eq!(created.created_at, f.clock.now());
    }

    #[tokio::test]
    async fn create_employee_rejects_a_duplicate_code_within_the_company() {
        let f = fixture();
        let ctx = TxContext::new();

        f.svc
            .create_employee(&ctx, create_input(&f, "emp-001"))
            .await
            .expect("first create succeeds");

        let err = f
            .svc
            .create_employee(&ctx, create_input(&f, "EMP-001"))
            .await
            .expect_err("duplicate code must be rejected");
        assert!(matches!(err, EmployeeError::CodeAlreadyExists));

        // The same code under another company is fine.
        let other_company = f.repo.add_company();
        f.svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    company_id: other_company.to_string(),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect("same code under another company succeeds");
    }

    #[tokio::test]
    async fn create_employee_rejects_an_inverted_employment_period() {
        let f = fixture();
        let ctx = TxContext::new();

        let err = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    hired_at: Some(date(2025, 3, 1)),
                    terminated_at: Some(date(2025, 2, 1)),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect_err("inverted period must be rejected");
        assert!(matches!(err, EmployeeError::InvalidEmploymentPeriod));
    }

    #[tokio::test]
    async fn create_employee_surfaces_missing_references() {
        let f = fixture();
        let ctx = TxContext::new();

        let err = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    company_id: Uuid::new_v4().to_string(),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect_err("unknown company must be rejected");
        assert!(matches!(err, EmployeeError::CompanyNotFound));

        let err = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    user_id: Uuid::new_v4().to_string(),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect_err("unknown user must be rejected");
        assert!(matches!(err, EmployeeError::UserNotFound));
    }

    #[tokio::test]
    async fn create_employee_validates_identifiers_before_storage() {
        let f = fixture();
        let ctx = TxContext::new();

        let err = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    company_id: "  ".into(),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect_err("blank company id must be rejected");
        assert!(matches!(err, EmployeeError::InvalidCompanyId));

        let err = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    user_id: "not-a-uuid".into(),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect_err("malformed user id must be rejected");
        assert!(matches!(err, EmployeeError::InvalidUserId));
    }

    #[tokio::test]
    async fn update_employee_applies_changes_and_revalidates_the_period() {
        let f = fixture();
        let ctx = TxContext::new();

        let created = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    hired_at: Some(date(2025, 1, 6)),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect("create succeeds");

        f.clock.advance(Duration::hours(1));

        let updated = f
            .svc
            .update_employee(
                &ctx,
                UpdateEmployeeInput {
                    id: created.id.to_string(),
                    status: Some("inactive".into()),
                    terminated_at: Some(Some(date(2025, 6, 30))),
                    ..Default::default()
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(updated.status, EmployeeStatus::Inactive);
        assert_eq!(updated.terminated_at, Some(date(2025, 6, 30)));
        assert_eq!(updated.updated_at, f.clock.now());

        // A termination before the stored hire date is rejected even though
        // only one side changed.
        let err = f
            .svc
            .update_employee(
                &ctx,
                UpdateEmployeeInput {
                    id: created.id.to_string(),
                    terminated_at: Some(Some(date(2024, 12, 31))),
                    ..Default::default()
                },
            )
            .await
            .expect_err("inverted period must be rejected");
        assert!(matches!(err, EmployeeError::InvalidEmploymentPeriod));
    }

    #[tokio::test]
    async fn update_employee_clears_dates_explicitly() {
        let f = fixture();
        let ctx = TxContext::new();

        let created = f
            .svc
            .create_employee(
                &ctx,
                CreateEmployeeInput {
                    hired_at: Some(date(2025, 1, 6)),
                    terminated_at: Some(date(2025, 6, 30)),
                    ..create_input(&f, "emp-001")
                },
            )
            .await
            .expect("create succeeds");

        let updated = f
            .svc
            .update_employee(
                &ctx,
                UpdateEmployeeInput {
                    id: created.id.to_string(),
                    terminated_at: Some(None),
                    ..Default::default()
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(updated.hired_at, Some(date(2025, 1, 6)));
        assert_eq!(updated.terminated_at, None);
    }

    #[tokio::test]
    async fn update_employee_refreshes_the_user_snapshot_on_reassignment() {
        let f = fixture();
        let ctx = TxContext::new();

        let created = f
            .svc
            .create_employee(&ctx, create_input(&f, "emp-001"))
            .await
            .expect("create succeeds");

        let other_user = f.repo.add_user("other@example.com");
        let updated = f
            .svc
            .update_employee(
                &ctx,
                UpdateEmployeeInput {
                    id: created.id.to_string(),
                    user_id: Some(other_user.to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(updated.user_id, other_user);
        assert_eq!(updated.user.email, "other@example.com");
    }

    #[tokio::test]
    async fn list_employees_requires_a_company_and_pages_in_order() {
        let f = fixture();
        let ctx = TxContext::new();

        let err = f
            .svc
            .list_employees(&ctx, ListEmployeesInput::default())
            .await
            .expect_err("missing company id must be rejected");
        assert!(matches!(err, EmployeeError::InvalidCompanyId));

        let mut ids = Vec::new();
        for code in ["a", "b", "c"] {
            let created = f
                .svc
                .create_employee(&ctx, create_input(&f, code))
                .await
                .expect("create succeeds");
            ids.push(created.id);
            f.clock.advance(Duration::seconds(1));
        }

        let first = f
            .svc
            .list_employees(
                &ctx,
                ListEmployeesInput {
                    company_id: f.company_id.to_string(),
                    page_size: 2,
                    ..Default::default()
                },
            )
            .await
            .expect("first page");
        assert_eq!(
            first.items.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![ids[2], ids[1]]
        );
        assert_eq!(first.next_page_token, "2");

        let second = f
            .svc
            .list_employees(
                &ctx,
                ListEmployeesInput {
                    company_id: f.company_id.to_string(),
                    page_size: 2,
                    page_token: first.next_page_token,
                    ..Default::default()
                },
            )
            .await
            .expect("second page");
        assert_eq!(
            second.items.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![ids[0]]
        );
        assert_eq!(second.next_page_token, "");
    }

    #[tokio::test]
    async fn delete_employee_removes_the_row() {
        let f = fixture();
        let ctx = TxContext::new();

        let created = f
            .svc
            .create_employee(&ctx, create_input(&f, "emp-001"))
            .await
            .expect("create succeeds");

        f.svc
            .delete_employee(&ctx, &created.id.to_string())
            .await
            .expect("delete succeeds");

        let err = f
            .svc
            .get_employee(&ctx, &created.id.to_string())
            .await
            .expect_err("deleted employee is gone");
        assert!(matches!(err, EmployeeError::NotFound));
    }
}
