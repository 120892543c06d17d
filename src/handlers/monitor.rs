//! 监控接口处理器
//!
//! 向展示层提供每轮刷新的结果，并接收筛选条件更新和刷新/停止指令
//!
//! ## API 列表
//!
//! - GET /monitor/report - 最近一轮完整结果
//! - GET /monitor/limit-up - 今日涨停板面板
//! - GET /monitor/candidates - 潜在涨停候选面板
//! - GET /monitor/status - 调度器状态
//! - GET /monitor/criteria - 当前筛选条件
//! - PUT /monitor/criteria - 更新筛选条件（下一轮生效）
//! - POST /monitor/refresh - 立即刷新
//! - POST /monitor/stop - 停止自动刷新
//! - POST /monitor/resume - 恢复自动刷新

use actix_web::{web, HttpResponse, Result};

use crate::models::{ApiResponse, CriteriaUpdate, FilterCriteria, MonitorReport, PanelReport};
use crate::services::scheduler::{MonitorCommand, MonitorHandle};

const NOT_READY: &str = "尚未完成首轮刷新";

fn not_ready<T>() -> HttpResponse
where
    T: serde::Serialize,
{
    HttpResponse::ServiceUnavailable().json(ApiResponse::<T>::error(NOT_READY))
}

fn panel_response(
    handle: &MonitorHandle,
    select: impl Fn(&MonitorReport) -> &PanelReport,
) -> HttpResponse {
    match handle.latest_report() {
        Some(report) => HttpResponse::Ok().json(ApiResponse::success(select(report.as_ref()))),
        None => not_ready::<PanelReport>(),
    }
}

/// GET /api/v1/monitor/report
pub async fn get_report(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    match handle.latest_report() {
        Some(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report.as_ref()))),
        None => Ok(not_ready::<MonitorReport>()),
    }
}

/// GET /api/v1/monitor/limit-up
pub async fn get_limit_up(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(panel_response(&handle, |report| &report.limit_up))
}

/// GET /api/v1/monitor/candidates
pub async fn get_candidates(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(panel_response(&handle, |report| &report.candidates))
}

/// GET /api/v1/monitor/status
pub async fn get_status(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(handle.status())))
}

/// GET /api/v1/monitor/criteria
pub async fn get_criteria(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(handle.criteria())))
}

/// PUT /api/v1/monitor/criteria
///
/// 只更新请求中给出的字段，任一字段越界则整体拒绝
pub async fn update_criteria(
    handle: web::Data<MonitorHandle>,
    body: web::Json<CriteriaUpdate>,
) -> Result<HttpResponse> {
    match handle.update_criteria(body.into_inner()) {
        Ok(criteria) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            criteria,
            "筛选条件已更新，下一轮生效",
        ))),
        Err(e) => Ok(HttpResponse::BadRequest().json(ApiResponse::<FilterCriteria>::error(e.to_string()))),
    }
}

async fn send_command(
    handle: &MonitorHandle,
    command: MonitorCommand,
    message: &'static str,
) -> HttpResponse {
    match handle.send(command).await {
        Ok(()) => HttpResponse::Accepted().json(ApiResponse::success_with_message(command_name(command), message)),
        Err(e) => HttpResponse::InternalServerError().json(ApiResponse::<&str>::error(e.to_string())),
    }
}

fn command_name(command: MonitorCommand) -> &'static str {
    match command {
        MonitorCommand::Refresh => "refresh",
        MonitorCommand::Stop => "stop",
        MonitorCommand::Resume => "resume",
    }
}

/// POST /api/v1/monitor/refresh
pub async fn refresh(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(send_command(&handle, MonitorCommand::Refresh, "已触发刷新").await)
}

/// POST /api/v1/monitor/stop
pub async fn stop(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(send_command(&handle, MonitorCommand::Stop, "本轮结束后停止自动刷新").await)
}

/// POST /api/v1/monitor/resume
pub async fn resume(handle: web::Data<MonitorHandle>) -> Result<HttpResponse> {
    Ok(send_command(&handle, MonitorCommand::Resume, "已恢复自动刷新").await)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/monitor")
            .route("/report", web::get().to(get_report))
            .route("/limit-up", web::get().to(get_limit_up))
            .route("/candidates", web::get().to(get_candidates))
            .route("/status", web::get().to(get_status))
            .route("/criteria", web::get().to(get_criteria))
            .route("/criteria", web::put().to(update_criteria))
            .route("/refresh", web::post().to(refresh))
            .route("/stop", web::post().to(stop))
            .route("/resume", web::post().to(resume)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::services::notifier::Notifier;
    use crate::services::scheduler::Scheduler;
    use crate::services::testing::{stock, ScriptedSource};

    fn scheduler() -> (Scheduler, MonitorHandle, Arc<ScriptedSource>) {
        let source = Arc::new(ScriptedSource::default());
        let (scheduler, handle) = Scheduler::new(
            source.clone(),
            Notifier::disabled(),
            FilterCriteria::default(),
            Duration::from_secs(10),
            true,
        );
        (scheduler, handle, source)
    }

    #[actix_web::test]
    async fn test_report_not_ready_before_first_cycle() {
        let (_scheduler, handle, _source) = scheduler();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(handle))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/monitor/report").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_candidates_panel_after_cycle() {
        let (mut scheduler, handle, source) = scheduler();
        source.push_spot(Ok(vec![stock("600001", 5.0, 5e7, 6.0, 1e10)]));
        scheduler.run_cycle().await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(handle))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/monitor/candidates").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ready");
        assert_eq!(body["data"]["rows"][0]["code"], "600001");
        assert_eq!(body["data"]["bootstrap"], true);
    }

    #[actix_web::test]
    async fn test_status_reports_stopped_flag() {
        let source = Arc::new(ScriptedSource::default());
        let (scheduler, handle) = Scheduler::new(
            source,
            Notifier::disabled(),
            FilterCriteria::default(),
            Duration::from_millis(20),
            false,
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(handle.clone()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/monitor/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "idle");
        assert_eq!(body["data"]["stopped"], false);

        let mut state = handle.subscribe_state();
        actix_web::rt::spawn(scheduler.run());
        state
            .wait_for(|s| *s == crate::models::MonitorState::Stopped)
            .await
            .unwrap();

        let req = test::TestRequest::get().uri("/monitor/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "stopped");
        assert_eq!(body["data"]["stopped"], true);
        assert_eq!(body["data"]["last_cycle"], 1);
    }

    #[actix_web::test]
    async fn test_update_criteria() {
        let (_scheduler, handle, _source) = scheduler();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(handle.clone()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/monitor/criteria")
            .set_json(serde_json::json!({"min_rise": 3.0, "search": "Bank 600"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(handle.criteria().min_rise, 3.0);
        assert_eq!(handle.criteria().search_keywords, vec!["bank", "600"]);

        let req = test::TestRequest::put()
            .uri("/monitor/criteria")
            .set_json(serde_json::json!({"max_rise": 12.0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(handle.criteria().max_rise, 9.5);
    }

    #[actix_web::test]
    async fn test_commands_accepted_while_scheduler_alive() {
        let (scheduler, handle, _source) = scheduler();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(handle))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post().uri("/monitor/refresh").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

        drop(scheduler);
        let req = test::TestRequest::post().uri("/monitor/stop").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
