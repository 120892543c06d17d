//! 公共常量和辅助函数

use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;
use serde_json::Value;
use std::collections::HashSet;

use super::FetchError;
use crate::models::StockSnapshotRow;

// ==================== 东方财富 API 常量 ====================

/// 东方财富涨停股池 API
pub const EM_ZT_POOL_API: &str = "https://push2ex.eastmoney.com/getTopicZTPool";
/// 涨停股池 ut 参数
pub const EM_ZT_POOL_UT: &str = "7eea3edcaed734bea9cbfc24409ed989";
/// 东方财富沪深京 A 股实时行情 API
pub const EM_SPOT_API: &str = "https://82.push2.eastmoney.com/api/qt/clist/get";
/// 实时行情 ut 参数
pub const EM_SPOT_UT: &str = "bd1d9ddb04089700cf9c27f6f7426281";
/// 沪深京 A 股板块过滤
pub const EM_SPOT_FS: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048";
/// 实时行情字段：最新价、涨跌幅、换手率、代码、名称、流通市值、主力净流入、行业
pub const EM_SPOT_FIELDS: &str = "f2,f3,f8,f12,f14,f21,f62,f100";
/// 实时行情最多翻页数
pub const EM_SPOT_MAX_PAGES: usize = 200;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 获取北京时间字符串（ISO 8601 格式，带+08:00时区）
pub fn get_beijing_time() -> String {
    Utc::now().with_timezone(&Shanghai).to_rfc3339()
}

/// 当前交易日（北京时间的日期）
pub fn trading_date() -> NaiveDate {
    Utc::now().with_timezone(&Shanghai).date_naive()
}

// ==================== 字段解析 ====================

/// 读取必填字符串字段，缺失或类型不符视为格式不匹配
pub fn required_str(item: &Value, key: &str) -> Result<String, FetchError> {
    match &item[key] {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Null => Err(FetchError::Schema(format!("缺少字段 {}", key))),
        other => Err(FetchError::Schema(format!("字段 {} 类型不符: {}", key, other))),
    }
}

/// 读取可选字符串字段，缺失或占位符 "-" 取空串
pub fn optional_str(item: &Value, key: &str) -> Result<String, FetchError> {
    match &item[key] {
        Value::Null => Ok(String::new()),
        Value::String(s) if s == "-" => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(FetchError::Schema(format!("字段 {} 类型不符: {}", key, other))),
    }
}

/// 读取数值字段
///
/// 东方财富对停牌股票返回 "-"，与缺失一样取 0
pub fn number(item: &Value, key: &str) -> Result<f64, FetchError> {
    match &item[key] {
        Value::Null => Ok(0.0),
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                return Ok(0.0);
            }
            s.parse::<f64>()
                .map_err(|_| FetchError::Schema(format!("字段 {} 不是数值: {}", key, s)))
        }
        other => Err(FetchError::Schema(format!("字段 {} 类型不符: {}", key, other))),
    }
}

/// 读取非负整数字段
pub fn integer(item: &Value, key: &str) -> Result<u64, FetchError> {
    let value = number(item, key)?;
    if value.is_finite() && value > 0.0 {
        Ok(value as u64)
    } else {
        Ok(0)
    }
}

/// 将整数形式的时间 92500 格式化为 "09:25:00"，0 视为无
pub fn format_hms(value: u64) -> String {
    if value == 0 {
        return String::new();
    }
    let hours = value / 10_000;
    let minutes = value / 100 % 100;
    let seconds = value % 100;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// 去除重复代码，保留首次出现的行
pub fn dedup_by_code(rows: Vec<StockSnapshotRow>) -> Vec<StockSnapshotRow> {
    let mut seen = HashSet::with_capacity(rows.len());
    let before = rows.len();
    let rows: Vec<StockSnapshotRow> = rows
        .into_iter()
        .filter(|row| seen.insert(row.code.clone()))
        .collect();
    if rows.len() != before {
        log::debug!("快照中有 {} 条重复代码已忽略", before - rows.len());
    }
    rows
}
