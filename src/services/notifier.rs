//! 推送通知
//!
//! 尽力而为：发送失败只记录日志，不重试，不向调用方返回错误

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::NotifyConfig;
use crate::models::{DeltaEvent, SnapshotKind, StockSnapshotRow};

/// Server酱推送 API
pub const SERVER_CHAN_API: &str = "https://sctapi.ftqq.com/";
/// 推送标题
pub const ALERT_TITLE: &str = "涨停警报!";

/// 推送通道
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// Server酱（微信）推送通道
pub struct ServerChanSink {
    client: Client,
    url: Url,
}

impl ServerChanSink {
    pub fn new(send_key: &str, timeout_secs: u64) -> Result<Self> {
        let url = Url::parse(SERVER_CHAN_API)?.join(&format!("{}.send", send_key))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotifySink for ServerChanSink {
    async fn send(&self, title: &str, body: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .form(&[("title", title), ("desp", body)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Server酱推送失败: {}", response.status()));
        }

        let json: serde_json::Value = response.json().await?;
        match json["code"].as_i64() {
            Some(0) | None => Ok(()),
            Some(code) => Err(anyhow!(
                "Server酱返回错误 {}: {}",
                code,
                json["message"].as_str().unwrap_or("")
            )),
        }
    }
}

/// 通知器
pub struct Notifier {
    sink: Option<Arc<dyn NotifySink>>,
    notify_on_bootstrap: bool,
}

impl Notifier {
    pub fn new(sink: Option<Arc<dyn NotifySink>>, notify_on_bootstrap: bool) -> Self {
        Self {
            sink,
            notify_on_bootstrap,
        }
    }

    /// 不推送的通知器
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    /// 根据配置创建，未配置 Server酱 Key 时不推送
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        if config.server_chan_key.trim().is_empty() {
            log::info!("未配置 Server酱 Key，推送已关闭");
            return Ok(Self::disabled());
        }
        let sink = ServerChanSink::new(config.server_chan_key.trim(), config.timeout_secs)?;
        Ok(Self::new(Some(Arc::new(sink)), config.notify_on_bootstrap))
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// 发送一条通知，失败只记录日志
    pub async fn notify(&self, title: &str, body: &str) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.send(title, body).await {
            Ok(()) => log::info!("推送成功: {}", title),
            Err(e) => log::warn!("推送失败（已忽略）: {}", e),
        }
    }

    /// 为非空增量发送通知，返回是否已发送
    pub async fn notify_delta(&self, event: &DeltaEvent) -> bool {
        if event.is_empty() || !self.is_enabled() {
            return false;
        }
        if event.bootstrap && !self.notify_on_bootstrap {
            log::info!("首轮 {} {} 个，跳过推送", event.kind.label(), event.new_codes.len());
            return false;
        }
        self.notify(ALERT_TITLE, &format_delta(event)).await;
        true
    }
}

fn format_row(kind: SnapshotKind, row: &StockSnapshotRow) -> String {
    match kind {
        SnapshotKind::LimitUp => format!(
            "{} {} 涨停时间 {} 连板 {} {}",
            row.code, row.name, row.limit_time, row.consecutive_boards, row.industry
        ),
        SnapshotKind::Candidates => format!(
            "{} {} 涨幅 {:.2}% 换手 {:.2}% 主力净流入 {:.0}万 {}",
            row.code,
            row.name,
            row.pct_change,
            row.turnover_rate,
            row.main_net_inflow / 10_000.0,
            row.industry
        ),
    }
}

/// 格式化增量通知正文
pub fn format_delta(event: &DeltaEvent) -> String {
    let mut body = format!("{} {} 个:", event.kind.label(), event.new_codes.len());
    for row in &event.rows {
        body.push('\n');
        body.push_str(&format_row(event.kind, row));
    }
    body
}
