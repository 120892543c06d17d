//! 健康检查，不需要认证

use actix_web::{web, HttpResponse, Result};

use crate::models::ApiResponse;
use crate::services::scheduler::MonitorHandle;

/// GET /api/v1/health
///
/// 返回调度器当前状态
pub async fn health_check(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    let response = ApiResponse::success_with_message(handle.state(), "Service is healthy");
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
