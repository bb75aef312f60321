use actix_web::{HttpResponse, web};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenType, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::{BootstrapAdmin, Config},
    error::{HrError, HrResult},
    model::{
        role::Role,
        user::{NewUser, User, UserSummary},
    },
    service::employee::LoginIdRegistry,
    store::{HrStore, StoreError},
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "ACJD20240001")]
    pub login_id: String,
    #[schema(example = "secret123")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Not needed on first login.
    pub current_password: Option<String>,
    #[schema(example = "n3w-secret")]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

/// Issues an access token and a persisted refresh token for `user`.
async fn issue_pair(
    store: &dyn HrStore,
    config: &Config,
    user: &User,
    now: DateTime<Utc>,
) -> HrResult<TokenPair> {
    let access_token = generate_access_token(
        user.id,
        &user.login_id,
        user.role.id(),
        user.employee_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|_| HrError::Internal("access token signing failed"))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        &user.login_id,
        user.role.id(),
        user.employee_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|_| HrError::Internal("refresh token signing failed"))?;

    let expires_at = now + Duration::seconds(config.refresh_token_ttl as i64);
    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store
        .insert_refresh_token(user.id, &refresh_claims.jti, expires_at)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Login ID or password missing"),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        })),
        (status = 403, description = "Account deactivated", body = Object, example = json!({
            "message": "Account is deactivated. Contact administrator."
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(store, config, body), fields(login_id = %body.login_id))]
pub async fn login(
    body: web::Json<LoginRequest>,
    store: web::Data<dyn HrStore>,
    config: web::Data<Config>,
) -> HrResult<HttpResponse> {
    info!("Login request received");

    let login_id = body.login_id.trim();
    if login_id.is_empty() || body.password.is_empty() {
        return Err(HrError::invalid("loginId", "Login ID and password are required"));
    }

    let Some(user) = store.find_user_by_login_id(login_id).await? else {
        info!("Invalid credentials: user not found");
        return Err(HrError::Unauthorized("Invalid credentials"));
    };

    if let Err(e) = verify_password(&body.password, &user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(HrError::Unauthorized("Invalid credentials"));
    }

    if !user.is_active {
        info!(user_id = user.id, "Login refused: account deactivated");
        return Err(HrError::Forbidden("Account is deactivated. Contact administrator."));
    }

    let now = Utc::now();
    let tokens = issue_pair(store.get_ref(), &config, &user, now).await?;

    if let Err(e) = store.record_login(user.id, now).await {
        // login still succeeds
        warn!(error = %e, user_id = user.id, "Failed to update last_login_at");
    }

    info!(user_id = user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: UserSummary::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Refresh token revoked, unknown or invalid, or the account is deactivated"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    store: web::Data<dyn HrStore>,
    config: web::Data<Config>,
) -> HrResult<HttpResponse> {
    let claims = verify_token(&body.refresh_token, &config.jwt_secret)
        .map_err(|_| HrError::Unauthorized("Invalid or expired token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(HrError::Unauthorized("Refresh token required"));
    }

    // rotation: a token can be exchanged once
    if !store.revoke_refresh_token(&claims.jti).await? {
        warn!(user_id = claims.user_id, jti = %claims.jti, "Refresh token reuse or unknown jti");
        return Err(HrError::Unauthorized("Refresh token revoked"));
    }

    // role or employee link may have changed since the token was issued
    let user = store
        .find_user(claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(HrError::Unauthorized("Unknown or deactivated user"))?;

    let tokens = issue_pair(store.get_ref(), &config, &user, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = RefreshRequest,
    responses(
        (status = 204, description = "Refresh token revoked (or was never valid)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    body: web::Json<RefreshRequest>,
    store: web::Data<dyn HrStore>,
    config: web::Data<Config>,
) -> HrResult<HttpResponse> {
    let claims = match verify_token(&body.refresh_token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::NoContent().finish()),
    };

    // idempotent
    if let Err(e) = store.revoke_refresh_token(&claims.jti).await {
        warn!(error = %e, jti = %claims.jti, "Failed to revoke refresh token");
    }

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, store: web::Data<dyn HrStore>) -> HrResult<HttpResponse> {
    let user = store
        .find_user(auth.user_id)
        .await?
        .ok_or(HrError::Unauthorized("Unknown user"))?;

    Ok(HttpResponse::Ok().json(UserSummary::from(&user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "message": "Password changed successfully"
        })),
        (status = 400, description = "Validation failure or wrong current password"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    store: web::Data<dyn HrStore>,
) -> HrResult<HttpResponse> {
    let body = body.into_inner();
    if body.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(HrError::invalid(
            "newPassword",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let user = store
        .find_user(auth.user_id)
        .await?
        .ok_or(HrError::Unauthorized("Unknown user"))?;

    if !user.is_first_login {
        let current = body.current_password.as_deref().unwrap_or_default();
        if verify_password(current, &user.password).is_err() {
            return Err(HrError::Conflict("Current password is incorrect".into()));
        }
    }

    let hashed = hash_password(&body.new_password)
        .map_err(|_| HrError::Internal("password hashing failed"))?;
    store.set_password(user.id, &hashed).await?;

    info!(user_id = user.id, "Password changed");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password changed successfully"
    })))
}

/// Seeds the configured admin account. `Ok(false)` when it already exists.
pub async fn bootstrap_admin(
    store: &dyn HrStore,
    registry: &LoginIdRegistry,
    admin: &BootstrapAdmin,
    now: DateTime<Utc>,
) -> HrResult<bool> {
    if store.find_user_by_login_id(&admin.login_id).await?.is_some() {
        return Ok(false);
    }

    let password = hash_password(&admin.password)
        .map_err(|_| HrError::Internal("password hashing failed"))?;
    let user = NewUser {
        login_id: admin.login_id.clone(),
        email: admin.email.trim().to_lowercase(),
        password,
        role: Role::Admin,
        employee_id: None,
        is_first_login: false,
    };

    match store.insert_user(user, now).await {
        Ok(user) => {
            registry.mark_taken(&user.login_id).await;
            info!(user_id = user.id, login_id = %user.login_id, "Bootstrap admin created");
            Ok(true)
        }
        // another instance seeded it first
        Err(StoreError::Duplicate) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{app, body_json, config, memory_store};
    use actix_web::{http::StatusCode, test};

    async fn seeded() -> (std::sync::Arc<crate::store::MemoryStore>, BootstrapAdmin) {
        let store = memory_store();
        let admin = BootstrapAdmin {
            login_id: "admin".into(),
            email: "Admin@Acme.test".into(),
            password: "admin-pass".into(),
        };
        assert!(
            bootstrap_admin(store.as_ref(), &LoginIdRegistry::default(), &admin, Utc::now())
                .await
                .unwrap()
        );
        (store, admin)
    }

    #[actix_web::test]
    async fn bootstrap_is_idempotent() {
        let (store, admin) = seeded().await;
        let again = bootstrap_admin(store.as_ref(), &LoginIdRegistry::default(), &admin, Utc::now())
            .await
            .unwrap();
        assert!(!again);

        let user = store.find_user_by_login_id("admin").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email, "admin@acme.test");
    }

    #[actix_web::test]
    async fn login_refresh_logout_flow() {
        let (store, _) = seeded().await;
        let app = test::init_service(app(store.clone(), config())).await;

        let bad = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({ "loginId": "admin", "password": "nope" }))
            .send_request(&app)
            .await;
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

        let resp = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({ "loginId": "admin", "password": "admin-pass" }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["user"]["role"], "admin");
        let access = body["accessToken"].as_str().unwrap().to_string();
        let refresh_token = body["refreshToken"].as_str().unwrap().to_string();

        let user = store.find_user_by_login_id("admin").await.unwrap().unwrap();
        assert!(user.last_login_at.is_some());

        // refresh tokens are not accepted on protected routes
        let misuse = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {refresh_token}")))
            .send_request(&app)
            .await;
        assert_eq!(misuse.status(), StatusCode::UNAUTHORIZED);

        let me = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {access}")))
            .send_request(&app)
            .await;
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(body_json(me).await["loginId"], "admin");

        let rotated = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(serde_json::json!({ "refreshToken": refresh_token }))
            .send_request(&app)
            .await;
        assert_eq!(rotated.status(), StatusCode::OK);
        let new_refresh = body_json(rotated).await["refreshToken"]
            .as_str()
            .unwrap()
            .to_string();

        // the old token was rotated out
        let replay = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(serde_json::json!({ "refreshToken": refresh_token }))
            .send_request(&app)
            .await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

        for _ in 0..2 {
            let out = test::TestRequest::post()
                .uri("/auth/logout")
                .set_json(serde_json::json!({ "refreshToken": new_refresh }))
                .send_request(&app)
                .await;
            assert_eq!(out.status(), StatusCode::NO_CONTENT);
        }

        let after_logout = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(serde_json::json!({ "refreshToken": new_refresh }))
            .send_request(&app)
            .await;
        assert_eq!(after_logout.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn change_password_checks_current_unless_first_login() {
        let (store, _) = seeded().await;
        let admin = store.find_user_by_login_id("admin").await.unwrap().unwrap();
        let token = crate::api::testing::token_for(&admin);
        let app = test::init_service(app(store.clone(), config())).await;

        let short = test::TestRequest::post()
            .uri("/api/auth/change-password")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({ "currentPassword": "admin-pass", "newPassword": "abc" }))
            .send_request(&app)
            .await;
        assert_eq!(short.status(), StatusCode::BAD_REQUEST);

        let wrong = test::TestRequest::post()
            .uri("/api/auth/change-password")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({ "currentPassword": "nope", "newPassword": "abcdef" }))
            .send_request(&app)
            .await;
        assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(wrong).await["message"], "Current password is incorrect");

        let ok = test::TestRequest::post()
            .uri("/api/auth/change-password")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({ "currentPassword": "admin-pass", "newPassword": "abcdef" }))
            .send_request(&app)
            .await;
        assert_eq!(ok.status(), StatusCode::OK);

        let user = store.find_user(admin.id).await.unwrap().unwrap();
        assert!(verify_password("abcdef", &user.password).is_ok());
    }
}
