//! A股涨停监控服务
//!
//! 定时轮询东方财富涨停股池和实时行情，发现新涨停和潜在涨停候选时推送通知，
//! 并通过 RESTful API 向展示层提供每轮结果

mod config;     // 配置加载与校验
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::ApiKeyMiddleware;
use crate::services::notifier::Notifier;
use crate::services::scheduler::Scheduler;
use crate::services::stock::EastmoneyClient;

/// 应用程序入口
///
/// 配置校验失败时直接退出，不启动监控循环
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let path = AppConfig::locate();
    let config = AppConfig::load(path)?;

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    match path {
        Some(path) => log::info!("从 {} 加载配置成功", path),
        None => log::info!("未找到配置文件，使用默认配置"),
    }

    if let Err(e) = config.validate() {
        log::error!("配置无效: {}", e);
        return Err(e.into());
    }

    if config.api.api_key.is_empty() {
        log::warn!("未设置 API_KEY，接口不做认证");
    }

    let source = Arc::new(EastmoneyClient::new(&config.api)?);
    let notifier = Notifier::from_config(&config.notify)?;
    let (scheduler, handle) = Scheduler::new(
        source,
        notifier,
        config.monitor.criteria(),
        config.monitor.refresh_interval(),
        config.monitor.auto_refresh,
    );
    let monitor = actix_web::rt::spawn(scheduler.run());

    log::info!("启动涨停监控服务，监听 {}", config.bind_addr());

    let api_key = config.api.api_key.clone();
    let data = web::Data::new(handle);
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 添加请求日志中间件
            .wrap(ApiKeyMiddleware::new(api_key.clone()))  // API Key 认证
            .app_data(data.clone())
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(config.bind_addr())?.run().await?;

    monitor.abort();
    log::info!("涨停监控服务已停止");
    Ok(())
}
