//! 业务逻辑服务模块
//!
//! 行情获取、筛选、差分、推送和调度

pub mod stock;      // 行情数据源
pub mod screening;  // 筛选引擎
pub mod state;      // 上一轮代码集合
pub mod notifier;   // 推送通知
pub mod scheduler;  // 监控调度器

#[cfg(test)]
pub mod testing;
