//! 东方财富股票接口实现
//!
//! 提供涨停股池和沪深京 A 股实时行情
//! 对接 https://push2ex.eastmoney.com 和 https://push2.eastmoney.com

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use super::common::{
    dedup_by_code, format_hms, integer, number, optional_str, required_str, EM_SPOT_API,
    EM_SPOT_FIELDS, EM_SPOT_FS, EM_SPOT_MAX_PAGES, EM_SPOT_UT, EM_ZT_POOL_API, EM_ZT_POOL_UT,
    USER_AGENT,
};
use super::{FetchError, MarketDataSource};
use crate::config::ApiConfig;
use crate::models::StockSnapshotRow;

/// 东方财富行情客户端
pub struct EastmoneyClient {
    /// HTTP 客户端（带超时）
    client: Client,
    /// 实时行情每页条数
    page_size: usize,
}

impl EastmoneyClient {
    /// 根据 API 配置创建客户端
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            page_size: config.spot_page_size.max(1),
        })
    }

    /// 发送 GET 请求并解析 JSON
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Referer", "https://quote.eastmoney.com/")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Network(format!("HTTP {}", response.status())));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Schema(format!("JSON 解析失败: {}", e)))
    }

    async fn fetch_spot_page(&self, page: usize) -> Result<(usize, Vec<StockSnapshotRow>), FetchError> {
        let query = [
            ("pn", page.to_string()),
            ("pz", self.page_size.to_string()),
            ("po", "1".to_string()),
            ("np", "1".to_string()),
            ("ut", EM_SPOT_UT.to_string()),
            ("fltt", "2".to_string()),
            ("invt", "2".to_string()),
            // 按代码排序，翻页期间顺序不随涨跌幅变动
            ("fid", "f12".to_string()),
            ("fs", EM_SPOT_FS.to_string()),
            ("fields", EM_SPOT_FIELDS.to_string()),
        ];
        let body = self.get_json(EM_SPOT_API, &query).await?;
        parse_spot_page(&body)
    }
}

#[async_trait]
impl MarketDataSource for EastmoneyClient {
    /// 对应 akshare 的 stock_zt_pool_em
    async fn fetch_limit_up(&self, date: NaiveDate) -> Result<Vec<StockSnapshotRow>, FetchError> {
        let query = [
            ("ut", EM_ZT_POOL_UT.to_string()),
            ("dpt", "wz.ztzt".to_string()),
            ("Pageindex", "0".to_string()),
            ("pagesize", "10000".to_string()),
            ("sort", "fbt:asc".to_string()),
            ("date", date.format("%Y%m%d").to_string()),
            ("_", Utc::now().timestamp_millis().to_string()),
        ];
        let body = self.get_json(EM_ZT_POOL_API, &query).await?;
        let rows = parse_limit_up_pool(&body)?;
        log::debug!("涨停股池 {} 共 {} 只", date, rows.len());
        Ok(rows)
    }

    /// 对应 akshare 的 stock_zh_a_spot_em，按页拉取直到凑满 total
    async fn fetch_spot(&self) -> Result<Vec<StockSnapshotRow>, FetchError> {
        let rows = collect_spot_pages(|page| self.fetch_spot_page(page)).await?;
        log::debug!("实时行情共 {} 只", rows.len());
        Ok(rows)
    }
}

/// 逐页拉取实时行情
///
/// 去重后的行数达到 total、遇到空页或达到翻页上限时结束
async fn collect_spot_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<StockSnapshotRow>, FetchError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<(usize, Vec<StockSnapshotRow>), FetchError>>,
{
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for page in 1..=EM_SPOT_MAX_PAGES {
        let (total, page_rows) = fetch_page(page).await?;
        if page_rows.is_empty() {
            break;
        }

        let fetched = page_rows.len();
        let before = rows.len();
        for row in page_rows {
            if seen.insert(row.code.clone()) {
                rows.push(row);
            }
        }
        if rows.len() - before < fetched {
            log::debug!("第 {} 页有 {} 条重复代码已忽略", page, fetched - (rows.len() - before));
        }

        if rows.len() >= total {
            break;
        }
    }

    Ok(rows)
}

/// 东方财富返回的 rc 非 0 表示请求被拒绝，data 不可信
fn check_rc(body: &Value) -> Result<(), FetchError> {
    let rc = body["rc"].as_i64().unwrap_or(0);
    if rc != 0 {
        return Err(FetchError::Schema(format!("东方财富返回错误码 rc={}", rc)));
    }
    Ok(())
}

/// 解析涨停股池响应
///
/// 格式: {"rc":0,"data":{"tc":1,"pool":[{"c":"600001","n":"名称","p":10230,...}]}}
/// 无涨停时 data 为 null
pub(crate) fn parse_limit_up_pool(body: &Value) -> Result<Vec<StockSnapshotRow>, FetchError> {
    check_rc(body)?;

    let data = &body["data"];
    if data.is_null() {
        return Ok(Vec::new());
    }

    let pool = match &data["pool"] {
        Value::Array(arr) => arr,
        Value::Null => return Ok(Vec::new()),
        other => return Err(FetchError::Schema(format!("pool 不是数组: {}", other))),
    };

    let mut rows = Vec::with_capacity(pool.len());
    for item in pool {
        rows.push(StockSnapshotRow {
            code: required_str(item, "c")?,
            name: optional_str(item, "n")?,
            // 价格单位为厘
            last_price: number(item, "p")? / 1000.0,
            pct_change: number(item, "zdp")?,
            turnover_rate: number(item, "hs")?,
            main_net_inflow: 0.0,
            float_market_cap: number(item, "ltsz")?,
            industry: optional_str(item, "hybk")?,
            limit_time: format_hms(integer(item, "fbt")?),
            consecutive_boards: integer(item, "lbc")? as u32,
        });
    }

    Ok(dedup_by_code(rows))
}

/// 解析实时行情单页响应，返回 (总数, 本页行)
///
/// 格式: {"rc":0,"data":{"total":5300,"diff":[{"f12":"600001","f14":"名称","f2":10.5,...}]}}
pub(crate) fn parse_spot_page(body: &Value) -> Result<(usize, Vec<StockSnapshotRow>), FetchError> {
    check_rc(body)?;

    let data = &body["data"];
    if data.is_null() {
        return Ok((0, Vec::new()));
    }

    let total = integer(data, "total")? as usize;
    let diff = match &data["diff"] {
        Value::Array(arr) => arr,
        Value::Null if total == 0 => return Ok((0, Vec::new())),
        Value::Null => return Err(FetchError::Schema(format!("total={} 但缺少 diff", total))),
        other => return Err(FetchError::Schema(format!("diff 不是数组: {}", other))),
    };

    let mut rows = Vec::with_capacity(diff.len());
    for item in diff {
        rows.push(StockSnapshotRow {
            code: required_str(item, "f12")?,
            name: optional_str(item, "f14")?,
            last_price: number(item, "f2")?,
            pct_change: number(item, "f3")?,
            turnover_rate: number(item, "f8")?,
            main_net_inflow: number(item, "f62")?,
            float_market_cap: number(item, "f21")?,
            industry: optional_str(item, "f100")?,
            limit_time: String::new(),
            consecutive_boards: 0,
        });
    }

    Ok((total, rows))
}
