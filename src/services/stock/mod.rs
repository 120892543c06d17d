//! 行情数据源模块
//!
//! 定义调度器所依赖的数据源接口，具体实现对接东方财富

mod common;
pub mod eastmoney;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{FetchErrorKind, StockSnapshotRow};

pub use common::{get_beijing_time, trading_date};
pub use eastmoney::EastmoneyClient;

/// 数据获取错误
///
/// 网络/超时属于瞬时错误；格式不匹配说明上游数据结构变化
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("网络错误: {0}")]
    Network(String),
    #[error("请求超时: {0}")]
    Timeout(String),
    #[error("数据格式不匹配: {0}")]
    Schema(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Timeout(_) => FetchErrorKind::Timeout,
            FetchError::Schema(_) => FetchErrorKind::Schema,
        }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Schema(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_decode() {
            FetchError::Schema(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// 行情数据源
///
/// 空结果是合法返回（尚无涨停、非交易日等）
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 获取指定交易日的涨停股池
    async fn fetch_limit_up(&self, date: NaiveDate) -> Result<Vec<StockSnapshotRow>, FetchError>;

    /// 获取全市场实时行情
    async fn fetch_spot(&self) -> Result<Vec<StockSnapshotRow>, FetchError>;
}
