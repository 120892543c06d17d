//! 监控输出模型
//!
//! 每轮刷新发布给展示层的数据结构

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::stock::{FilterCriteria, SnapshotKind, StockSnapshotRow};

/// 新出现代码的增量事件
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaEvent {
    pub kind: SnapshotKind,
    /// 本轮出现而上一轮没有的代码
    pub new_codes: HashSet<String>,
    /// 当前快照中属于 new_codes 的行，保持当前表的顺序
    pub rows: Vec<StockSnapshotRow>,
    /// 该类快照首次记录时为 true
    pub bootstrap: bool,
}

impl DeltaEvent {
    pub fn is_empty(&self) -> bool {
        self.new_codes.is_empty()
    }
}

/// 获取失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Schema,
}

/// 单个面板（涨停板或候选）的展示输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelReport {
    Ready {
        /// 当前表（已应用搜索，可能截断）
        rows: Vec<StockSnapshotRow>,
        /// 新出现的行（可能截断）
        new_rows: Vec<StockSnapshotRow>,
        /// 未截断、未搜索的总数
        total: usize,
        /// 未截断的新出现数
        new_total: usize,
        bootstrap: bool,
    },
    Unavailable {
        error_kind: FetchErrorKind,
        message: String,
    },
}

impl PanelReport {
    pub fn is_ready(&self) -> bool {
        matches!(self, PanelReport::Ready { .. })
    }
}

/// 一轮刷新的完整输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    /// 轮次，从 1 开始
    pub cycle: u64,
    /// 更新时间（北京时间）
    pub updated_at: String,
    /// 交易日 YYYYMMDD
    pub trading_date: String,
    /// 本轮使用的筛选条件
    pub criteria: FilterCriteria,
    pub limit_up: PanelReport,
    pub candidates: PanelReport,
}

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Fetching,
    Screening,
    Diffing,
    Notifying,
    Publishing,
    Sleeping,
    Stopped,
}

/// 调度器状态查询结果
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// 自动刷新已停止；停止期间手动刷新时 state 仍会经过 fetching 等阶段
    pub stopped: bool,
    pub last_cycle: Option<u64>,
    pub last_updated_at: Option<String>,
}
