//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，启动前校验，校验失败不进入监控循环

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::models::stock::check_range;
use crate::models::{CriteriaError, FilterCriteria};
use crate::services::screening::parse_keywords;

/// 刷新间隔上下限（秒）
pub const REFRESH_INTERVAL_RANGE: (f64, f64) = (2.0, 120.0);

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
    /// 行情请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 实时行情每页条数
    #[serde(default = "default_spot_page_size")]
    pub spot_page_size: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 监控配置
///
/// 金额单位为元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 是否自动刷新，关闭时只刷新一轮
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    /// 刷新间隔（秒），范围 [2, 120]
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// 最低涨幅 (%)
    #[serde(default = "default_min_rise")]
    pub min_rise: f64,
    /// 最高涨幅 (%)
    #[serde(default = "default_max_rise")]
    pub max_rise: f64,
    /// 最低主力净流入（元）
    #[serde(default = "default_min_main_inflow")]
    pub min_main_inflow: f64,
    /// 最低换手率 (%)
    #[serde(default = "default_min_turnover")]
    pub min_turnover: f64,
    /// 最高流通市值（元）
    #[serde(default = "default_max_market_cap")]
    pub max_market_cap: f64,
    /// 搜索代码/名称/行业，空格分隔多个关键词
    #[serde(default)]
    pub search: String,
}

/// 推送配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Server酱 SendKey（为空则不推送）
    #[serde(default)]
    pub server_chan_key: String,
    /// 首轮是否推送全部结果
    #[serde(default = "default_true")]
    pub notify_on_bootstrap: bool,
    /// 推送请求超时（秒）
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// 配置错误，启动阶段致命
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path} 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path} 失败: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("refresh_interval_secs 取值 {0} 超出范围 [2, 120]")]
    RefreshInterval(u64),
    #[error("spot_page_size 不能为 0")]
    PageSize,
    #[error(transparent)]
    Criteria(#[from] CriteriaError),
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 10 }
fn default_connect_timeout() -> u64 { 5 }
fn default_spot_page_size() -> usize { 100 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }
fn default_refresh_interval() -> u64 { 10 }
fn default_min_rise() -> f64 { 4.0 }
fn default_max_rise() -> f64 { 9.5 }
fn default_min_main_inflow() -> f64 { 30_000_000.0 }
fn default_min_turnover() -> f64 { 5.0 }
fn default_max_market_cap() -> f64 { 15_000_000_000.0 }
fn default_notify_timeout() -> u64 { 10 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            spot_page_size: default_spot_page_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_interval_secs: default_refresh_interval(),
            min_rise: default_min_rise(),
            max_rise: default_max_rise(),
            min_main_inflow: default_min_main_inflow(),
            min_turnover: default_min_turnover(),
            max_market_cap: default_max_market_cap(),
            search: String::new(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            server_chan_key: String::new(),
            notify_on_bootstrap: true,
            timeout_secs: default_notify_timeout(),
        }
    }
}

impl MonitorConfig {
    /// 构造初始筛选条件
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            min_rise: self.min_rise,
            max_rise: self.max_rise,
            min_main_inflow: self.min_main_inflow,
            min_turnover: self.min_turnover,
            max_market_cap: self.max_market_cap,
            search_keywords: parse_keywords(&self.search),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })
    }

    /// 查找配置文件，依次尝试 config.json 和 config/config.json
    pub fn locate() -> Option<&'static str> {
        ["config.json", "config/config.json"]
            .into_iter()
            .find(|path| Path::new(path).exists())
    }

    /// 加载配置：有文件则读取，否则使用默认值，再叠加环境变量
    ///
    /// 在日志初始化之前调用，不输出日志
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// 环境变量 API_KEY / SERVER_CHAN_KEY 覆盖文件配置
    fn apply_env(&mut self) {
        if let Ok(key) = env::var("API_KEY") {
            self.api.api_key = key;
        }
        if let Ok(key) = env::var("SERVER_CHAN_KEY") {
            self.notify.server_chan_key = key;
        }
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.monitor.refresh_interval_secs;
        if check_range("refresh_interval_secs", interval as f64, REFRESH_INTERVAL_RANGE).is_err() {
            return Err(ConfigError::RefreshInterval(interval));
        }
        if self.api.spot_page_size == 0 {
            return Err(ConfigError::PageSize);
        }
        self.monitor.criteria().validate()?;
        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
