use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::{auth::auth::AuthUser, error::HrResult, service::dashboard as board, store::HrStore};

/// Dashboard. Head counts, today's attendance and the newest pending leave requests.
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard figures", body = crate::service::dashboard::Dashboard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn dashboard(auth: AuthUser, store: web::Data<dyn HrStore>) -> HrResult<HttpResponse> {
    auth.require_people_manager()?;

    let dashboard = board::dashboard(store.get_ref(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
