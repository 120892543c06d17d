//! 股票数据模型
//!
//! 定义行情快照行、筛选条件等数据结构

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 行情快照中的一行
///
/// 涨停池与实时行情共用此结构，快照中缺失的字段取空串或 0
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockSnapshotRow {
    /// 股票代码（快照内唯一）
    pub code: String,
    /// 股票名称
    pub name: String,
    /// 最新价
    pub last_price: f64,
    /// 涨跌幅（百分比）
    pub pct_change: f64,
    /// 换手率（百分比）
    pub turnover_rate: f64,
    /// 主力净流入-净额（元）
    pub main_net_inflow: f64,
    /// 流通市值（元）
    pub float_market_cap: f64,
    /// 所属行业
    pub industry: String,
    /// 首次封板时间 HH:MM:SS，仅涨停池提供
    pub limit_time: String,
    /// 连板数，仅涨停池提供
    pub consecutive_boards: u32,
}

/// 快照类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// 今日涨停板
    LimitUp,
    /// 潜在涨停候选
    Candidates,
}

impl SnapshotKind {
    /// 中文标签，用于日志和推送
    pub fn label(&self) -> &'static str {
        match self {
            SnapshotKind::LimitUp => "新涨停",
            SnapshotKind::Candidates => "新潜在候选",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::LimitUp => write!(f, "limit_up"),
            SnapshotKind::Candidates => write!(f, "candidates"),
        }
    }
}

/// 潜在涨停筛选条件
///
/// 每轮刷新开始时取一次快照，轮内不变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// 最低涨幅 (%)
    pub min_rise: f64,
    /// 最高涨幅 (%)，未涨停
    pub max_rise: f64,
    /// 最低主力净流入（元）
    pub min_main_inflow: f64,
    /// 最低换手率 (%)
    pub min_turnover: f64,
    /// 最高流通市值（元）
    pub max_market_cap: f64,
    /// 搜索关键词（已小写）
    pub search_keywords: Vec<String>,
}

/// 取值范围校验错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("{field} 取值 {value} 超出范围 [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} 不能为负数或非数字: {value}")]
    Negative { field: &'static str, value: f64 },
}

/// 涨幅上下限
pub const RISE_RANGE: (f64, f64) = (0.0, 9.9);
/// 换手率上下限
pub const TURNOVER_RANGE: (f64, f64) = (0.0, 50.0);

impl FilterCriteria {
    /// 校验各阈值的取值范围
    pub fn validate(&self) -> Result<(), CriteriaError> {
        check_range("min_rise", self.min_rise, RISE_RANGE)?;
        check_range("max_rise", self.max_rise, RISE_RANGE)?;
        check_non_negative("min_main_inflow", self.min_main_inflow)?;
        check_range("min_turnover", self.min_turnover, TURNOVER_RANGE)?;
        check_non_negative("max_market_cap", self.max_market_cap)?;
        Ok(())
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_rise: 4.0,
            max_rise: 9.5,
            min_main_inflow: 30_000_000.0,
            min_turnover: 5.0,
            max_market_cap: 15_000_000_000.0,
            search_keywords: Vec::new(),
        }
    }
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
) -> Result<(), CriteriaError> {
    // NaN 不满足任何比较，同样落入此分支
    if !(value >= min && value <= max) {
        return Err(CriteriaError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), CriteriaError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CriteriaError::Negative { field, value });
    }
    Ok(())
}

/// 筛选条件的部分更新
///
/// 未给出的字段保持原值；`search` 为原始搜索文本
#[derive(Debug, Default, Deserialize)]
pub struct CriteriaUpdate {
    pub min_rise: Option<f64>,
    pub max_rise: Option<f64>,
    pub min_main_inflow: Option<f64>,
    pub min_turnover: Option<f64>,
    pub max_market_cap: Option<f64>,
    pub search: Option<String>,
}
