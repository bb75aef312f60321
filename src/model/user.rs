use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::role::Role;

#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub login_id: String,
    pub email: String,
    /// argon2 PHC string
    pub password: String,
    pub role: Role,
    pub employee_id: Option<u64>,
    pub is_first_login: bool,
    /// Inactive accounts can neither log in nor refresh.
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub login_id: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub employee_id: Option<u64>,
    pub is_first_login: bool,
}

/// What a client is allowed to see about an account.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "ACJD20240001")]
    pub login_id: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    pub role: Role,
    pub is_first_login: bool,
    pub is_active: bool,
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login_id: user.login_id.clone(),
            email: user.email.clone(),
            role: user.role,
            is_first_login: user.is_first_login,
            is_active: user.is_active,
            employee_id: user.employee_id,
        }
    }
}
