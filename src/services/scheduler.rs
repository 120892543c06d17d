//! 监控调度器
//!
//! 单任务循环：获取 → 筛选 → 差分 → 推送 → 发布 → 等待，直到收到停止指令。
//! 停止标志只在等待结束、进入下一轮之前检查，进行中的一轮总会执行完。

use anyhow::{anyhow, Result};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::notifier::Notifier;
use super::screening::{apply_search, parse_keywords, screen_candidates, sort_limit_up};
use super::state::StateTracker;
use super::stock::{get_beijing_time, trading_date, FetchError, MarketDataSource};
use crate::models::{
    CriteriaError, CriteriaUpdate, DeltaEvent, FilterCriteria, MonitorReport, MonitorState,
    MonitorStatus, PanelReport, SnapshotKind, StockSnapshotRow,
};

/// 候选表展示条数
pub const DISPLAY_CANDIDATE_LIMIT: usize = 50;
/// 新候选展示条数
pub const DISPLAY_NEW_CANDIDATE_LIMIT: usize = 20;

const COMMAND_BUFFER: usize = 16;

/// 外部控制指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    /// 立即刷新；已停止时只执行一轮
    Refresh,
    /// 设置停止标志
    Stop,
    /// 清除停止标志并恢复自动刷新
    Resume,
}

type ReportSlot = Option<Arc<MonitorReport>>;

/// 调度器的外部句柄，供展示层读取结果和发送指令
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    report: watch::Receiver<ReportSlot>,
    state: watch::Receiver<MonitorState>,
    stopped: watch::Receiver<bool>,
    criteria: Arc<RwLock<FilterCriteria>>,
}

impl MonitorHandle {
    /// 最近一轮发布的结果
    pub fn latest_report(&self) -> Option<Arc<MonitorReport>> {
        self.report.borrow().clone()
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    pub fn status(&self) -> MonitorStatus {
        let report = self.latest_report();
        MonitorStatus {
            state: self.state(),
            stopped: self.is_stopped(),
            last_cycle: report.as_ref().map(|r| r.cycle),
            last_updated_at: report.map(|r| r.updated_at.clone()),
        }
    }

    /// 停止标志是否已设置
    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    pub fn subscribe_reports(&self) -> watch::Receiver<ReportSlot> {
        self.report.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    /// 当前筛选条件
    pub fn criteria(&self) -> FilterCriteria {
        match self.criteria.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 部分更新筛选条件，校验失败时不做任何修改
    ///
    /// 新条件在下一轮开始时生效
    pub fn update_criteria(&self, update: CriteriaUpdate) -> Result<FilterCriteria, CriteriaError> {
        let mut guard = match self.criteria.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut next = guard.clone();
        if let Some(v) = update.min_rise {
            next.min_rise = v;
        }
        if let Some(v) = update.max_rise {
            next.max_rise = v;
        }
        if let Some(v) = update.min_main_inflow {
            next.min_main_inflow = v;
        }
        if let Some(v) = update.min_turnover {
            next.min_turnover = v;
        }
        if let Some(v) = update.max_market_cap {
            next.max_market_cap = v;
        }
        if let Some(search) = update.search {
            next.search_keywords = parse_keywords(&search);
        }
        next.validate()?;

        *guard = next.clone();
        log::info!("筛选条件已更新: {:?}", next);
        Ok(next)
    }

    /// 发送控制指令
    pub async fn send(&self, command: MonitorCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("监控调度器已退出"))
    }
}

/// 等待阶段的结果
enum Wake {
    Continue,
    Closed,
}

/// 成功获取并差分后的一张表
struct Pipeline {
    rows: Vec<StockSnapshotRow>,
    delta: DeltaEvent,
}

/// 监控调度器
pub struct Scheduler {
    source: Arc<dyn MarketDataSource>,
    notifier: Notifier,
    tracker: StateTracker,
    criteria: Arc<RwLock<FilterCriteria>>,
    interval: Duration,
    auto_refresh: bool,
    cycle: u64,
    commands: mpsc::Receiver<MonitorCommand>,
    report_tx: watch::Sender<ReportSlot>,
    state_tx: watch::Sender<MonitorState>,
    stopped_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// 创建调度器及其句柄
    ///
    /// `auto_refresh` 为 false 时首轮结束后即停止
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        notifier: Notifier,
        criteria: FilterCriteria,
        interval: Duration,
        auto_refresh: bool,
    ) -> (Self, MonitorHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (report_tx, report_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(MonitorState::Idle);
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let criteria = Arc::new(RwLock::new(criteria));

        let handle = MonitorHandle {
            commands: command_tx,
            report: report_rx,
            state: state_rx,
            stopped: stopped_rx,
            criteria: criteria.clone(),
        };

        let scheduler = Self {
            source,
            notifier,
            tracker: StateTracker::new(),
            criteria,
            interval,
            auto_refresh,
            cycle: 0,
            commands: command_rx,
            report_tx,
            state_tx,
            stopped_tx,
        };

        (scheduler, handle)
    }

    fn set_state(&self, state: MonitorState) {
        self.state_tx.send_replace(state);
    }

    fn stop_requested(&self) -> bool {
        *self.stopped_tx.borrow()
    }

    fn set_stopped(&self, stopped: bool) {
        self.stopped_tx.send_replace(stopped);
    }

    fn criteria_snapshot(&self) -> FilterCriteria {
        match self.criteria.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 运行监控循环，所有句柄释放后返回
    pub async fn run(mut self) {
        log::info!(
            "启动涨停监控，刷新间隔 {} 秒，自动刷新: {}",
            self.interval.as_secs_f64(),
            self.auto_refresh
        );

        loop {
            if self.stop_requested() {
                self.set_state(MonitorState::Stopped);
                match self.commands.recv().await {
                    Some(MonitorCommand::Refresh) => {
                        log::info!("手动刷新");
                        self.run_cycle().await;
                        continue;
                    }
                    Some(MonitorCommand::Resume) => {
                        log::info!("恢复自动刷新");
                        self.set_stopped(false);
                        self.auto_refresh = true;
                    }
                    Some(MonitorCommand::Stop) => continue,
                    None => break,
                }
            }

            self.run_cycle().await;
            if !self.auto_refresh {
                self.set_stopped(true);
                continue;
            }

            self.set_state(MonitorState::Sleeping);
            if let Wake::Closed = self.sleep().await {
                break;
            }
        }

        self.set_state(MonitorState::Stopped);
        log::info!("涨停监控已退出");
    }

    /// 等待一个刷新间隔；刷新或停止指令会提前结束等待
    async fn sleep(&mut self) -> Wake {
        let deadline = tokio::time::sleep(self.interval);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return Wake::Continue,
                command = self.commands.recv() => match command {
                    Some(MonitorCommand::Refresh) => {
                        log::info!("手动刷新");
                        return Wake::Continue;
                    }
                    Some(MonitorCommand::Stop) => {
                        log::info!("收到停止指令");
                        self.set_stopped(true);
                        return Wake::Continue;
                    }
                    Some(MonitorCommand::Resume) => {}
                    None => return Wake::Closed,
                },
            }
        }
    }

    /// 执行完整的一轮并发布结果
    pub async fn run_cycle(&mut self) -> Arc<MonitorReport> {
        self.cycle += 1;
        let criteria = self.criteria_snapshot();
        let date = trading_date();

        self.set_state(MonitorState::Fetching);
        let limit_up = self.source.fetch_limit_up(date).await;
        let spot = self.source.fetch_spot().await;

        self.set_state(MonitorState::Screening);
        let limit_up = limit_up.map(|mut rows| {
            sort_limit_up(&mut rows);
            rows
        });
        let candidates = spot.map(|spot| screen_candidates(&spot, &criteria));

        self.set_state(MonitorState::Diffing);
        let tracker = &mut self.tracker;
        let limit_up = limit_up.map(|rows| {
            let delta = tracker.diff_rows(SnapshotKind::LimitUp, &rows);
            Pipeline { rows, delta }
        });
        let candidates = candidates.map(|rows| {
            let delta = tracker.diff_rows(SnapshotKind::Candidates, &rows);
            Pipeline { rows, delta }
        });

        self.set_state(MonitorState::Notifying);
        for (kind, pipeline) in [
            (SnapshotKind::LimitUp, &limit_up),
            (SnapshotKind::Candidates, &candidates),
        ] {
            match pipeline {
                Ok(p) if !p.delta.is_empty() => {
                    log::info!("第 {} 轮 {} {} 个", self.cycle, kind.label(), p.delta.new_codes.len());
                    self.notifier.notify_delta(&p.delta).await;
                }
                Ok(_) => {}
                Err(e) => log_fetch_error(kind, e),
            }
        }

        self.set_state(MonitorState::Publishing);
        let keywords = &criteria.search_keywords;
        let limit_up = build_panel(SnapshotKind::LimitUp, &limit_up, keywords);
        let candidates = build_panel(SnapshotKind::Candidates, &candidates, keywords);
        let report = Arc::new(MonitorReport {
            cycle: self.cycle,
            updated_at: get_beijing_time(),
            trading_date: date.format("%Y%m%d").to_string(),
            criteria,
            limit_up,
            candidates,
        });
        self.report_tx.send_replace(Some(report.clone()));
        report
    }
}

fn log_fetch_error(kind: SnapshotKind, err: &FetchError) {
    if err.is_transient() {
        log::warn!("{} 数据暂不可用，本轮跳过: {}", kind, err);
    } else {
        log::error!("{} 数据格式异常，本轮跳过: {}", kind, err);
    }
}

fn truncated(mut rows: Vec<StockSnapshotRow>, limit: usize) -> Vec<StockSnapshotRow> {
    rows.truncate(limit);
    rows
}

/// 生成展示输出：搜索与截断只作用于展示，不影响差分
fn build_panel(
    kind: SnapshotKind,
    pipeline: &Result<Pipeline, FetchError>,
    keywords: &[String],
) -> PanelReport {
    let p = match pipeline {
        Ok(p) => p,
        Err(e) => {
            return PanelReport::Unavailable {
                error_kind: e.kind(),
                message: e.to_string(),
            }
        }
    };

    let (rows, new_rows) = match kind {
        SnapshotKind::LimitUp => (apply_search(&p.rows, keywords), p.delta.rows.clone()),
        SnapshotKind::Candidates => (
            truncated(apply_search(&p.rows, keywords), DISPLAY_CANDIDATE_LIMIT),
            truncated(apply_search(&p.delta.rows, keywords), DISPLAY_NEW_CANDIDATE_LIMIT),
        ),
    };

    PanelReport::Ready {
        rows,
        new_rows,
        total: p.rows.len(),
        new_total: p.delta.new_codes.len(),
        bootstrap: p.delta.bootstrap,
    }
}
