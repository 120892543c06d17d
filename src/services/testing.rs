//! 测试用的内存数据源和推送通道

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use super::notifier::NotifySink;
use super::stock::{FetchError, MarketDataSource};
use crate::models::StockSnapshotRow;

type Scripted = Mutex<VecDeque<Result<Vec<StockSnapshotRow>, FetchError>>>;

/// 按预设顺序返回结果的数据源，脚本用完后返回空快照
#[derive(Default)]
pub struct ScriptedSource {
    limit_up: Scripted,
    spot: Scripted,
    spot_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn push_limit_up(&self, result: Result<Vec<StockSnapshotRow>, FetchError>) {
        self.limit_up.lock().unwrap().push_back(result);
    }

    pub fn push_spot(&self, result: Result<Vec<StockSnapshotRow>, FetchError>) {
        self.spot.lock().unwrap().push_back(result);
    }

    pub fn spot_calls(&self) -> usize {
        self.spot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_limit_up(&self, _date: NaiveDate) -> Result<Vec<StockSnapshotRow>, FetchError> {
        self.limit_up.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn fetch_spot(&self) -> Result<Vec<StockSnapshotRow>, FetchError> {
        self.spot_calls.fetch_add(1, Ordering::SeqCst);
        self.spot.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }
}

/// 涨停股池请求会挂起直到放行的数据源，用于观察进行中的一轮
#[derive(Default)]
pub struct GatedSource {
    /// 进入 fetch_limit_up 时通知
    pub entered: Notify,
    /// 放行挂起的请求
    pub release: Notify,
}

#[async_trait]
impl MarketDataSource for GatedSource {
    async fn fetch_limit_up(&self, _date: NaiveDate) -> Result<Vec<StockSnapshotRow>, FetchError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }

    async fn fetch_spot(&self) -> Result<Vec<StockSnapshotRow>, FetchError> {
        Ok(Vec::new())
    }
}

/// 记录所有推送的通道
#[derive(Default)]
pub struct RecordingSink {
    fail: bool,
    attempts: AtomicUsize,
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotifySink for RecordingSink {
    async fn send(&self, title: &str, body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// 构造一行测试数据
pub fn stock(code: &str, pct: f64, inflow: f64, turnover: f64, cap: f64) -> StockSnapshotRow {
    StockSnapshotRow {
        code: code.to_string(),
        name: format!("股票{}", code),
        pct_change: pct,
        main_net_inflow: inflow,
        turnover_rate: turnover,
        float_market_cap: cap,
        ..Default::default()
    }
}
