//! Employee onboarding and profile maintenance.

use std::sync::atomic::{AtomicBool, Ordering};

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::password::hash_password,
    error::{FieldError, HrError, HrResult},
    model::{
        employee::{Employee, EmployeeProfileUpdate, NewEmployee},
        role::Role,
        user::NewUser,
    },
    store::{EmployeeFilter, HrStore, StoreError},
    utils::{login_id_cache::LoginIdCache, login_id_filter::LoginIdFilter},
};

const TEMP_PASSWORD_LEN: usize = 8;
const TEMP_PASSWORD_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const MAX_INITIALS: usize = 4;
const MAX_SERIAL_ATTEMPTS: u32 = 20;
const RECENT_LOGIN_DAYS: i64 = 30;

/// Answers "is this login ID taken?" without a store round trip in the common case.
///
/// Once warmed up the filter gives a definite "no"; the cache a definite "yes";
/// anything else falls through to the store. A stale "no" only costs a retry,
/// the store's unique keys have the final word.
#[derive(Default)]
pub struct LoginIdRegistry {
    filter: LoginIdFilter,
    cache: LoginIdCache,
    warmed: AtomicBool,
}

impl LoginIdRegistry {
    pub async fn is_taken(&self, store: &dyn HrStore, login_id: &str) -> HrResult<bool> {
        if self.warmed.load(Ordering::Acquire) && !self.filter.might_exist(login_id) {
            return Ok(false);
        }
        if self.cache.is_taken(login_id).await {
            return Ok(true);
        }

        let taken = store.find_user_by_login_id(login_id).await?.is_some();
        if taken {
            self.mark_taken(login_id).await;
        }
        Ok(taken)
    }

    pub async fn mark_taken(&self, login_id: &str) {
        self.filter.insert(login_id);
        self.cache.mark_taken(login_id).await;
    }

    /// Loads every issued ID into the filter and recently active ones into the cache.
    pub async fn warm_up(&self, store: &dyn HrStore, now: DateTime<Utc>) -> HrResult<(usize, usize)> {
        let all = store.login_ids().await?;
        let filtered = self.filter.insert_batch(&all);

        let since = now - chrono::Duration::days(RECENT_LOGIN_DAYS);
        let recent = store.recent_login_ids(since).await?;
        self.cache.mark_batch(&recent).await;

        self.warmed.store(true, Ordering::Release);
        Ok((filtered, recent.len()))
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "Acme Corp")]
    pub company: String,
    #[schema(example = "AC")]
    pub company_code: String,
    #[schema(example = 2024)]
    pub year_of_joining: i32,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    #[schema(example = "+8801712345678")]
    pub phone: Option<String>,
    /// Defaults to `employee`; anything else needs an admin.
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardedEmployee {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "ACJD20240001")]
    pub login_id: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    pub role: Role,
    /// Shown once; the account must change it on first login.
    #[schema(example = "aB3dE5gH")]
    pub temporary_password: String,
}

/// Profile edits plus the account switches only managers may flip.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[serde(flatten)]
    pub profile: EmployeeProfileUpdate,
    /// Admin only.
    pub role: Option<Role>,
    /// HR/Admin only.
    pub is_active: Option<bool>,
}

/// Upper-cased first letter of each name part, at most four.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(MAX_INITIALS)
        .collect()
}

pub fn format_login_id(company_code: &str, initials: &str, year: i32, serial: u32) -> String {
    format!("{company_code}{initials}{year}{serial:04}")
}

pub fn temporary_password() -> String {
    (0..TEMP_PASSWORD_LEN)
        .map(|_| {
            let idx = OsRng.next_u32() as usize % TEMP_PASSWORD_CHARSET.len();
            char::from(TEMP_PASSWORD_CHARSET[idx])
        })
        .collect()
}

fn validate(input: &CreateEmployee) -> HrResult<()> {
    let mut errors = Vec::new();
    if input.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    let email = input.email.trim();
    if email.is_empty() || !email.contains('@') {
        errors.push(FieldError::new("email", "Valid email is required"));
    }
    if input.company.trim().is_empty() {
        errors.push(FieldError::new("company", "Company is required"));
    }
    if input.company_code.trim().is_empty() {
        errors.push(FieldError::new("companyCode", "Company code is required"));
    }
    if !(1900..=9999).contains(&input.year_of_joining) {
        errors.push(FieldError::new("yearOfJoining", "Year of joining is required"));
    }
    HrError::check(errors)
}

fn email_taken() -> HrError {
    HrError::Conflict("Employee with this email already exists".into())
}

/// Creates the employee, their login and an opening leave balance.
pub async fn create(
    store: &dyn HrStore,
    registry: &LoginIdRegistry,
    actor: Role,
    input: CreateEmployee,
    now: DateTime<Utc>,
) -> HrResult<OnboardedEmployee> {
    validate(&input)?;

    let role = input.role.unwrap_or(Role::Employee);
    if role != Role::Employee && !actor.can_assign_roles() {
        return Err(HrError::Forbidden("Only admins can assign roles"));
    }

    let email = input.email.trim().to_lowercase();
    if store.find_employee_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let company_code = input.company_code.trim().to_uppercase();
    let name = input.name.trim().to_string();
    let employee_initials = initials(&name);
    let year = input.year_of_joining;

    let password = temporary_password();
    let password_hash =
        hash_password(&password).map_err(|_| HrError::Internal("password hashing failed"))?;

    let mut serial = store
        .max_serial_number(&company_code, year)
        .await?
        .unwrap_or(0)
        + 1;
    let mut attempts = 0;

    let (employee, user) = loop {
        let login_id = format_login_id(&company_code, &employee_initials, year, serial);
        attempts += 1;

        if registry.is_taken(store, &login_id).await? {
            serial += 1;
        } else {
            let candidate = NewEmployee {
                login_id: login_id.clone(),
                name: name.clone(),
                email: email.clone(),
                company: input.company.trim().to_string(),
                company_code: company_code.clone(),
                department: input.department.clone(),
                phone: input.phone.clone(),
                year_of_joining: year,
                serial_number: serial,
                employee_initials: employee_initials.clone(),
            };
            let account = NewUser {
                login_id,
                email: email.clone(),
                password: password_hash.clone(),
                role,
                employee_id: None,
                is_first_login: true,
            };
            match store.insert_employee_account(candidate, account, now).await {
                Ok(created) => break created,
                // a concurrent onboarding took the email, the serial or the login ID
                Err(StoreError::Duplicate) => {
                    if store.find_employee_by_email(&email).await?.is_some() {
                        return Err(email_taken());
                    }
                    serial += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if attempts >= MAX_SERIAL_ATTEMPTS {
            return Err(HrError::Conflict("Could not allocate a login ID".into()));
        }
    };

    registry.mark_taken(&user.login_id).await;
    store.leave_balance(employee.id, now).await?;

    info!(
        employee_id = employee.id,
        login_id = %employee.login_id,
        role = %user.role,
        "Employee onboarded"
    );

    Ok(OnboardedEmployee {
        employee_id: employee.id,
        login_id: employee.login_id,
        name: employee.name,
        email: employee.email,
        role: user.role,
        temporary_password: password,
    })
}

pub async fn get(store: &dyn HrStore, employee_id: u64) -> HrResult<Employee> {
    store
        .find_employee(employee_id)
        .await?
        .ok_or(HrError::NotFound("Employee"))
}

pub async fn list(store: &dyn HrStore, filter: &EmployeeFilter) -> HrResult<Vec<Employee>> {
    Ok(store.list_employees(filter).await?)
}

pub async fn update(
    store: &dyn HrStore,
    actor: Role,
    employee_id: u64,
    update: EmployeeUpdate,
    now: DateTime<Utc>,
) -> HrResult<Employee> {
    if update.role.is_some() && !actor.can_assign_roles() {
        return Err(HrError::Forbidden("Only admins can change roles"));
    }
    if update.is_active.is_some() && !actor.can_manage_people() {
        return Err(HrError::Forbidden("HR/Admin only"));
    }

    let mut employee = get(store, employee_id).await?;

    if let Some(role) = update.role {
        if !store.set_user_role(employee_id, role).await? {
            return Err(HrError::NotFound("User account"));
        }
        info!(employee_id, %role, "Role changed");
    }
    if let Some(active) = update.is_active {
        store.set_employee_active(employee_id, active, now).await?;
        employee.is_active = active;
        info!(employee_id, active, "Account status changed");
    }

    employee.apply_update(update.profile, now);
    store.update_employee(&employee).await?;

    info!(employee_id, "Employee profile updated");
    Ok(employee)
}

/// Soft delete: the employee and its login are deactivated, history stays.
pub async fn deactivate(store: &dyn HrStore, employee_id: u64, now: DateTime<Utc>) -> HrResult<()> {
    if !store.set_employee_active(employee_id, false, now).await? {
        return Err(HrError::NotFound("Employee"));
    }
    info!(employee_id, "Employee deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::verify_password, store::MemoryStore};

    fn input(name: &str, email: &str) -> CreateEmployee {
        CreateEmployee {
            name: name.into(),
            email: email.into(),
            company: "Acme Corp".into(),
            company_code: "AC".into(),
            year_of_joining: 2024,
            department: Some("Engineering".into()),
            phone: None,
            role: None,
        }
    }

    #[test]
    fn initials_take_first_letters() {
        assert_eq!(initials("john doe"), "JD");
        assert_eq!(initials("  Mary   Ann  Lee "), "MAL");
        assert_eq!(initials("a b c d e"), "ABCD");
        assert_eq!(format_login_id("AC", "JD", 2024, 7), "ACJD20240007");
    }

    #[test]
    fn temporary_passwords_are_alphanumeric() {
        let password = temporary_password();
        assert_eq!(password.len(), 8);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[actix_web::test]
    async fn onboarding_creates_login_and_balance() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();

        let first = create(&store, &registry, Role::Hr, input("John Doe", "John@Acme.test"), now)
            .await
            .unwrap();
        assert_eq!(first.login_id, "ACJD20240001");
        assert_eq!(first.email, "john@acme.test");

        let second = create(&store, &registry, Role::Hr, input("Jane Roe", "jane@acme.test"), now)
            .await
            .unwrap();
        assert_eq!(second.login_id, "ACJR20240002");

        let user = store.find_user_by_login_id("ACJD20240001").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Employee);
        assert!(user.is_first_login);
        assert_eq!(user.employee_id, Some(first.employee_id));
        assert!(verify_password(&first.temporary_password, &user.password).is_ok());

        let balance = store.leave_balance(first.employee_id, now).await.unwrap();
        assert_eq!((balance.paid_leave, balance.sick_leave), (12, 6));
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();

        create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now)
            .await
            .unwrap();
        assert!(matches!(
            create(&store, &registry, Role::Hr, input("Johnny Doe", "JOHN@acme.test"), now).await,
            Err(HrError::Conflict(_))
        ));
    }

    #[actix_web::test]
    async fn taken_login_id_bumps_the_serial() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();

        // an account that already owns the next ID, with no employee row behind it
        store
            .insert_user(
                NewUser {
                    login_id: "ACJD20240001".into(),
                    email: "legacy@acme.test".into(),
                    password: "x".into(),
                    role: Role::Hr,
                    employee_id: None,
                    is_first_login: false,
                },
                now,
            )
            .await
            .unwrap();
        registry.warm_up(&store, now).await.unwrap();

        let created = create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now)
            .await
            .unwrap();
        assert_eq!(created.login_id, "ACJD20240002");
    }

    #[actix_web::test]
    async fn update_keeps_untouched_fields() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();
        let created = create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now)
            .await
            .unwrap();

        let updated = update(
            &store,
            Role::Hr,
            created.employee_id,
            EmployeeUpdate {
                profile: EmployeeProfileUpdate {
                    phone: Some("+100".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+100"));
        assert_eq!(updated.department.as_deref(), Some("Engineering"));
        assert_eq!(get(&store, created.employee_id).await.unwrap().phone.as_deref(), Some("+100"));

        assert!(matches!(
            update(&store, Role::Hr, 999, EmployeeUpdate::default(), now).await,
            Err(HrError::NotFound("Employee"))
        ));
    }

    #[actix_web::test]
    async fn missing_fields_are_reported() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let mut bad = input(" ", "not-an-email");
        bad.company_code = String::new();

        match create(&store, &registry, Role::Hr, bad, Utc::now()).await {
            Err(HrError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["name", "email", "companyCode"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    async fn seed_login(store: &MemoryStore, login_id: &str) {
        store
            .insert_user(
                NewUser {
                    login_id: login_id.into(),
                    email: "admin@acme.test".into(),
                    password: "x".into(),
                    role: Role::Admin,
                    employee_id: None,
                    is_first_login: false,
                },
                Utc::now(),
            )
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn cold_registry_still_sees_existing_logins() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();
        seed_login(&store, "ACJD20240001").await;

        let created = create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now)
            .await
            .unwrap();
        assert_eq!(created.login_id, "ACJD20240002");

        let user = store.find_user_by_login_id("ACJD20240002").await.unwrap().unwrap();
        assert_eq!(user.employee_id, Some(created.employee_id));
        assert_eq!(store.list_employees(&EmployeeFilter::default()).await.unwrap().len(), 1);

        // a retry is reported as the duplicate it is
        assert!(matches!(
            create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now).await,
            Err(HrError::Conflict(m)) if m.contains("email")
        ));
    }

    #[actix_web::test]
    async fn stale_registry_never_leaves_an_orphan_employee() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();
        // warmed before another instance issued the ID
        registry.warm_up(&store, now).await.unwrap();
        seed_login(&store, "ACJD20240001").await;

        let created = create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now)
            .await
            .unwrap();
        assert_eq!(created.login_id, "ACJD20240002");

        let employees = store.list_employees(&EmployeeFilter::default()).await.unwrap();
        assert_eq!(employees.len(), 1);
        let login = store.find_user_by_login_id(&employees[0].login_id).await.unwrap().unwrap();
        assert_eq!(login.employee_id, Some(employees[0].id));
    }

    #[actix_web::test]
    async fn only_admins_hand_out_roles() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();
        let mut hr_hire = input("Harriet Ross", "harriet@acme.test");
        hr_hire.role = Some(Role::Hr);

        assert!(matches!(
            create(&store, &registry, Role::Hr, hr_hire.clone(), now).await,
            Err(HrError::Forbidden(_))
        ));
        assert!(store.find_employee_by_email("harriet@acme.test").await.unwrap().is_none());

        let created = create(&store, &registry, Role::Admin, hr_hire, now).await.unwrap();
        assert_eq!(created.role, Role::Hr);

        let promote = EmployeeUpdate {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert!(matches!(
            update(&store, Role::Hr, created.employee_id, promote.clone(), now).await,
            Err(HrError::Forbidden(_))
        ));
        update(&store, Role::Admin, created.employee_id, promote, now).await.unwrap();
        let user = store.find_user_by_login_id(&created.login_id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[actix_web::test]
    async fn deactivation_is_soft_and_reversible() {
        let store = MemoryStore::new();
        let registry = LoginIdRegistry::default();
        let now = Utc::now();
        let created = create(&store, &registry, Role::Hr, input("John Doe", "john@acme.test"), now)
            .await
            .unwrap();

        deactivate(&store, created.employee_id, now).await.unwrap();
        assert!(!get(&store, created.employee_id).await.unwrap().is_active);
        let user = store.find_user_by_login_id(&created.login_id).await.unwrap().unwrap();
        assert!(!user.is_active);
        assert!(matches!(deactivate(&store, 999, now).await, Err(HrError::NotFound("Employee"))));

        let reactivate = EmployeeUpdate {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            update(&store, Role::Employee, created.employee_id, reactivate.clone(), now).await,
            Err(HrError::Forbidden(_))
        ));
        let employee = update(&store, Role::Hr, created.employee_id, reactivate, now).await.unwrap();
        assert!(employee.is_active);
        let user = store.find_user_by_login_id(&created.login_id).await.unwrap().unwrap();
        assert!(user.is_active);
    }
}
