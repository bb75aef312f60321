use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Approve leave, edit salary profiles, onboard people, read anyone's records.
    pub fn can_manage_people(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }

    /// Generate and lock payroll.
    pub fn can_run_payroll(self) -> bool {
        self == Role::Admin
    }

    /// Grant HR or admin to an account.
    pub fn can_assign_roles(self) -> bool {
        self == Role::Admin
    }

    /// Check in/out, mark attendance and apply for leave.
    pub fn is_self_service(self) -> bool {
        self == Role::Employee
    }

    pub fn sees_only_own_records(self) -> bool {
        self == Role::Employee
    }
}
