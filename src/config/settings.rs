// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含数据库、服务器、调度、重试、抓取后端、搜索发现、日志和指标等所有配置项
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 调度器配置
    pub scheduler: SchedulerSettings,
    /// 失败退避配置
    pub retry: RetrySettings,
    /// 抓取后端配置
    pub fetch: FetchSettings,
    /// 搜索发现配置
    pub discovery: DiscoverySettings,
    /// 占位内容配置
    pub placeholder: PlaceholderSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
    /// 是否输出 SQL 日志
    pub sqlx_logging: bool,
    /// 启动时是否自动执行迁移
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://socialcrawl.db?mode=rwc".to_string(),
            max_connections: Some(20),
            min_connections: Some(1),
            connect_timeout: Some(10),
            idle_timeout: Some(300),
            sqlx_logging: false,
            run_migrations: true,
        }
    }
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 调度器配置设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// 启动时是否自动运行调度循环
    pub enabled: bool,
    /// 发现周期（秒）
    pub tick_interval_secs: u64,
    /// 最大并发作业数
    pub max_concurrent_jobs: usize,
    /// 每次作业请求的内容条数
    pub fetch_limit: usize,
    /// 单次存储调用超时（秒）
    pub store_timeout_secs: u64,
    /// 单个作业超时（秒）
    pub job_timeout_secs: u64,
    /// 启动时视为僵死的 crawling 状态时长（分钟）
    pub stale_crawling_threshold_mins: i64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_secs: 30,
            max_concurrent_jobs: 3,
            fetch_limit: 20,
            store_timeout_secs: 10,
            job_timeout_secs: 180,
            stale_crawling_threshold_mins: 60,
        }
    }
}

impl SchedulerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs.max(1))
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs.max(1))
    }
}

/// 失败退避配置设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// 失败后是否推迟下次抓取；关闭时失败的创作者在下一个周期立即重试
    pub failure_backoff_enabled: bool,
    /// 初始退避（秒）
    pub base_delay_secs: u64,
    /// 最大退避（秒）
    pub max_delay_secs: u64,
    /// 退避倍数
    pub multiplier: f64,
    /// 抖动比例，0 到 1
    pub jitter: f64,
    /// 连续失败多少次后进入 needs_attention，0 表示不限制
    pub max_consecutive_failures: i32,
    /// 临时任务默认最大尝试次数
    pub task_max_attempts: i32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            failure_backoff_enabled: true,
            base_delay_secs: 60,
            max_delay_secs: 3600,
            multiplier: 2.0,
            jitter: 0.2,
            max_consecutive_failures: 5,
            task_max_attempts: 3,
        }
    }
}

/// 单个后端服务端点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// 服务地址，未配置时该后端不启用
    pub base_url: Option<String>,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl EndpointSettings {
    fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            base_url: None,
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self::with_timeout(30)
    }
}

/// 熔断器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

/// 平台级抓取覆盖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformFetchSettings {
    /// 后端优先级，如 ["browser", "http"]
    pub priority: Vec<String>,
}

/// 抓取后端配置设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// 浏览器渲染服务
    pub browser: EndpointSettings,
    /// 轻量 HTTP 抓取服务
    pub http: EndpointSettings,
    /// 爬虫会话服务
    pub crawler_service: EndpointSettings,
    /// 非 JS 平台的默认后端顺序
    pub default_priority: Vec<String>,
    /// JS 平台在浏览器失败后是否回退到 HTTP
    pub fallback_enabled: bool,
    /// 熔断器
    pub circuit_breaker: CircuitBreakerSettings,
    /// 按平台覆盖的后端优先级
    pub platforms: HashMap<String, PlatformFetchSettings>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            browser: EndpointSettings::with_timeout(60),
            http: EndpointSettings::with_timeout(30),
            crawler_service: EndpointSettings::with_timeout(60),
            default_priority: vec!["http".to_string(), "browser".to_string()],
            fallback_enabled: true,
            circuit_breaker: CircuitBreakerSettings::default(),
            platforms: HashMap::new(),
        }
    }
}

/// 搜索发现配置设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// 是否启用搜索发现层
    pub enabled: bool,
    /// 按顺序使用的搜索引擎
    pub engines: Vec<String>,
    pub bing_base_url: String,
    pub baidu_base_url: String,
    pub sogou_base_url: String,
    /// 每个引擎最多取多少条结果
    pub max_results: usize,
    /// 单次搜索超时（秒）
    pub request_timeout_secs: u64,
    /// 每个引擎每秒请求数上限
    pub requests_per_second: u32,
    /// 标题相似度阈值，超过视为重复
    pub title_similarity_threshold: f64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            engines: vec![
                "bing".to_string(),
                "baidu".to_string(),
                "sogou".to_string(),
            ],
            bing_base_url: "https://www.bing.com".to_string(),
            baidu_base_url: "https://www.baidu.com".to_string(),
            sogou_base_url: "https://www.sogou.com".to_string(),
            max_results: 10,
            request_timeout_secs: 15,
            requests_per_second: 2,
            title_similarity_threshold: 0.92,
        }
    }
}

impl DiscoverySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// 占位内容配置设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderSettings {
    /// 所有层级失败后是否生成合成内容
    pub enabled: bool,
}

impl Default for PlaceholderSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// EnvFilter 指令，RUST_LOG 优先
    pub level: String,
    /// 是否输出 JSON 格式
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info,socialcrawl=debug".to_string(),
            json: false,
        }
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "0.0.0.0:9090".to_string(),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次合并内置默认值、config/default.toml、config/{APP_ENVIRONMENT}.toml
    /// 和 SOCIALCRAWL__ 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://socialcrawl.db?mode=rwc")?
            .set_default("scheduler.tick_interval_secs", 30)?
            .set_default("scheduler.max_concurrent_jobs", 3)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("SOCIALCRAWL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("fetch.default_priority")
                    .with_list_parse_key("discovery.engines")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
