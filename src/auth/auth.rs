use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::{
    auth::jwt::{Claims, TokenType, verify_token},
    config::Config,
    error::{HrError, HrResult},
    model::role::Role,
};

/// The caller behind a request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub login_id: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Accepts access tokens only.
    pub fn from_token(token: &str, secret: &str) -> HrResult<Self> {
        let claims = verify_token(token, secret).map_err(|_| HrError::Unauthorized("Invalid or expired token"))?;
        Self::from_claims(claims)
    }

    pub fn from_claims(claims: Claims) -> HrResult<Self> {
        if claims.token_type != TokenType::Access {
            return Err(HrError::Unauthorized("Access token required"));
        }
        let role = Role::from_id(claims.role).ok_or(HrError::Unauthorized("Invalid role"))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            login_id: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_people_manager(&self) -> HrResult<()> {
        if self.role.can_manage_people() {
            Ok(())
        } else {
            Err(HrError::Forbidden("HR/Admin only"))
        }
    }

    pub fn require_payroll_runner(&self) -> HrResult<()> {
        if self.role.can_run_payroll() {
            Ok(())
        } else {
            Err(HrError::Forbidden("Admin only"))
        }
    }

    pub fn own_employee_id(&self) -> HrResult<u64> {
        self.employee_id
            .ok_or(HrError::Forbidden("No employee profile"))
    }

    /// Check-in/out, marking and leave applications; returns the caller's employee id.
    pub fn require_self_service(&self) -> HrResult<u64> {
        if !self.role.is_self_service() {
            return Err(HrError::Forbidden("Employees only"));
        }
        self.own_employee_id()
    }

    /// Narrows a list filter: employees are pinned to themselves, managers pass through.
    pub fn scope(&self, requested: Option<u64>) -> HrResult<Option<u64>> {
        if !self.role.sees_only_own_records() {
            return Ok(requested);
        }
        let own = self.own_employee_id()?;
        match requested {
            Some(id) if id != own => Err(HrError::Forbidden("Access denied")),
            _ => Ok(Some(own)),
        }
    }

    /// Managers see everyone; employees only themselves.
    pub fn ensure_can_view(&self, employee_id: u64) -> HrResult<()> {
        if self.role.sees_only_own_records() && self.employee_id != Some(employee_id) {
            return Err(HrError::Forbidden("Access denied"));
        }
        Ok(())
    }

    /// The subject of a per-employee read: the caller for employees, the given id for managers.
    pub fn subject(&self, requested: Option<u64>) -> HrResult<u64> {
        match self.scope(requested)? {
            Some(id) => Ok(id),
            None => self
                .employee_id
                .ok_or_else(|| HrError::invalid("employeeId", "employeeId is required")),
        }
    }
}

pub(crate) fn bearer_token(req: &HttpRequest) -> HrResult<&str> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or(HrError::Unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| HrError::Unauthorized("Invalid Authorization header encoding"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or(HrError::Unauthorized("Authorization header must start with Bearer"))
}

impl FromRequest for AuthUser {
    type Error = HrError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(HrError::Internal("config missing from app data")));
        };

        ready(bearer_token(req).and_then(|token| AuthUser::from_token(token, &config.jwt_secret)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            login_id: "x".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn refresh_tokens_are_not_access_tokens() {
        let (refresh, _) = generate_refresh_token(1, "admin", 1, None, "k", 60).unwrap();
        assert!(matches!(
            AuthUser::from_token(&refresh, "k"),
            Err(HrError::Unauthorized(_))
        ));

        let access = generate_access_token(1, "admin", 1, None, "k", 60).unwrap();
        assert_eq!(AuthUser::from_token(&access, "k").unwrap().role, Role::Admin);
    }

    #[test]
    fn employees_are_scoped_to_themselves() {
        let employee = user(Role::Employee, Some(5));
        assert_eq!(employee.scope(None).unwrap(), Some(5));
        assert_eq!(employee.scope(Some(5)).unwrap(), Some(5));
        assert!(matches!(employee.scope(Some(6)), Err(HrError::Forbidden(_))));
        assert!(employee.ensure_can_view(6).is_err());

        let hr = user(Role::Hr, None);
        assert_eq!(hr.scope(None).unwrap(), None);
        assert_eq!(hr.scope(Some(6)).unwrap(), Some(6));
        assert!(hr.ensure_can_view(6).is_ok());
        assert!(matches!(hr.subject(None), Err(HrError::Validation(_))));
    }

    #[test]
    fn capabilities_gate_actions() {
        assert!(user(Role::Hr, None).require_payroll_runner().is_err());
        assert!(user(Role::Admin, None).require_payroll_runner().is_ok());
        assert!(user(Role::Employee, Some(1)).require_people_manager().is_err());
        assert!(user(Role::Hr, Some(2)).require_self_service().is_err());
        assert_eq!(user(Role::Employee, Some(3)).require_self_service().unwrap(), 3);
        assert!(user(Role::Employee, None).require_self_service().is_err());
    }
}
