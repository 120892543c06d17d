//! 上一轮代码集合的跟踪
//!
//! 由调度器独占持有，每轮结束时整体替换

use std::collections::HashSet;

use crate::models::{DeltaEvent, SnapshotKind, StockSnapshotRow};

#[derive(Debug, Default)]
struct TrackedSet {
    codes: HashSet<String>,
    recorded: bool,
}

/// 涨停板与候选的上一轮代码集合
#[derive(Debug, Default)]
pub struct StateTracker {
    limit_up: TrackedSet,
    candidates: TrackedSet,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: SnapshotKind) -> &mut TrackedSet {
        match kind {
            SnapshotKind::LimitUp => &mut self.limit_up,
            SnapshotKind::Candidates => &mut self.candidates,
        }
    }

    /// 上一轮记录的代码集合
    pub fn previous(&self, kind: SnapshotKind) -> &HashSet<String> {
        match kind {
            SnapshotKind::LimitUp => &self.limit_up.codes,
            SnapshotKind::Candidates => &self.candidates.codes,
        }
    }

    /// 该类快照是否已记录过
    pub fn is_recorded(&self, kind: SnapshotKind) -> bool {
        match kind {
            SnapshotKind::LimitUp => self.limit_up.recorded,
            SnapshotKind::Candidates => self.candidates.recorded,
        }
    }

    /// 计算 current − previous，并无条件以 current 替换 previous
    ///
    /// 返回 (新出现代码, 是否首次记录)
    pub fn diff(&mut self, kind: SnapshotKind, current: HashSet<String>) -> (HashSet<String>, bool) {
        let slot = self.slot(kind);
        let new_codes: HashSet<String> = current.difference(&slot.codes).cloned().collect();
        let bootstrap = !slot.recorded;
        slot.codes = current;
        slot.recorded = true;
        (new_codes, bootstrap)
    }

    /// 对一张表做差分，返回带行数据的增量事件
    ///
    /// rows 中的顺序即增量行的顺序
    pub fn diff_rows(&mut self, kind: SnapshotKind, rows: &[StockSnapshotRow]) -> DeltaEvent {
        let current: HashSet<String> = rows.iter().map(|row| row.code.clone()).collect();
        let (new_codes, bootstrap) = self.diff(kind, current);
        let new_rows = rows
            .iter()
            .filter(|row| new_codes.contains(&row.code))
            .cloned()
            .collect();

        DeltaEvent {
            kind,
            new_codes,
            rows: new_rows,
            bootstrap,
        }
    }
}
