use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};

use crate::{
    auth::auth::{AuthUser, bearer_token},
    config::Config,
    error::HrError,
};

/// Rejects requests without a valid access token and stores the caller in request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(config) = req.app_data::<Data<Config>>().cloned() else {
        let err = HrError::Internal("config missing from app data");
        return Ok(req.into_response(err.error_response()));
    };

    let auth_user = match bearer_token(req.request())
        .and_then(|token| AuthUser::from_token(token, &config.jwt_secret))
    {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(path = %req.path(), error = %err, "Rejected unauthenticated request");
            return Ok(req.into_response(err.error_response()));
        }
    };

    tracing::debug!(
        path = %req.path(),
        login_id = %auth_user.login_id,
        role = %auth_user.role,
        "Authenticated request"
    );
    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
