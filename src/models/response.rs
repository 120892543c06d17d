//! 通用 API 响应模型
//!
//! 所有监控接口使用统一的响应信封

use serde::{Deserialize, Serialize};

use crate::services::stock::get_beijing_time;

/// 统一 API 响应结构
///
/// - success: 请求是否成功
/// - data: 响应数据（成功时有值）
/// - message: 响应消息
/// - timestamp: 响应时间戳（北京时间，ISO 8601）
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "Success")
    }

    /// 创建带说明的成功响应
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            timestamp: get_beijing_time(),
        }
    }

    /// 创建错误响应
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            timestamp: get_beijing_time(),
        }
    }
}
