use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 考试后端地址
    pub api_base_url: String,
    /// 考试代码
    pub exam_code: String,
    /// 考试语言
    pub language: String,
    /// 考试总时长（秒）
    pub exam_duration_secs: u32,
    /// 提交请求超时（秒）
    pub submit_timeout_secs: u64,
    /// 本地存储目录（答题草稿、考生信息）
    pub storage_dir: String,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 监考页面 URL
    pub proctor_page_url: String,
    /// 监考信号轮询间隔（毫秒）
    pub probe_interval_ms: u64,
    /// 时间窗口内允许的非致命违规次数，None 表示只警告
    pub violation_limit: Option<u32>,
    /// 违规统计窗口（秒）
    pub violation_window_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

fn not_positive(var_name: &str) -> AppError {
    ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: "0".to_string(),
        expected_type: "正整数".to_string(),
    }
    .into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://talent-backend-i83x.onrender.com".to_string(),
            exam_code: String::new(),
            language: "en".to_string(),
            exam_duration_secs: 60 * 60,
            submit_timeout_secs: 15,
            storage_dir: "exam_storage".to_string(),
            browser_debug_port: 9222,
            proctor_page_url: "about:blank".to_string(),
            probe_interval_ms: 250,
            violation_limit: None,
            violation_window_secs: 300,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文本解析配置，缺失字段使用默认值
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 加载配置：可选的 TOML 文件 + 环境变量覆盖
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<Config>(&content).map_err(|e| {
                    AppError::Config(ConfigError::FileParseFailed {
                        path: path.display().to_string(),
                        source: Box::new(e),
                    })
                })?
            }
            _ => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 检查必填项
    pub fn validate(&self) -> AppResult<()> {
        if self.exam_code.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "EXAM_CODE".to_string(),
            }
            .into());
        }
        if self.exam_duration_secs == 0 {
            return Err(not_positive("EXAM_DURATION_SECS"));
        }
        if self.submit_timeout_secs == 0 {
            return Err(not_positive("SUBMIT_TIMEOUT_SECS"));
        }
        self.violation_window()?;
        Ok(())
    }

    /// 违规统计窗口
    ///
    /// # 返回
    /// 窗口为 0 或超出 `chrono` 可表示的范围时返回配置错误
    pub fn violation_window(&self) -> AppResult<chrono::TimeDelta> {
        i64::try_from(self.violation_window_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(chrono::TimeDelta::try_seconds)
            .ok_or_else(|| {
                ConfigError::EnvVarParseFailed {
                    var_name: "VIOLATION_WINDOW_SECS".to_string(),
                    value: self.violation_window_secs.to_string(),
                    expected_type: "有效的秒数".to_string(),
                }
                .into()
            })
    }

    fn with_env_overrides(self) -> Self {
        let current = self;
        Self {
            api_base_url: std::env::var("EXAM_API_BASE_URL").unwrap_or(current.api_base_url),
            exam_code: std::env::var("EXAM_CODE").unwrap_or(current.exam_code),
            language: std::env::var("EXAM_LANG").unwrap_or(current.language),
            exam_duration_secs: std::env::var("EXAM_DURATION_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(current.exam_duration_secs),
            submit_timeout_secs: std::env::var("SUBMIT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(current.submit_timeout_secs),
            storage_dir: std::env::var("EXAM_STORAGE_DIR").unwrap_or(current.storage_dir),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(current.browser_debug_port),
            proctor_page_url: std::env::var("PROCTOR_PAGE_URL").unwrap_or(current.proctor_page_url),
            probe_interval_ms: std::env::var("PROBE_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(current.probe_interval_ms),
            violation_limit: std::env::var("VIOLATION_LIMIT").ok().and_then(|v| v.parse().ok()).or(current.violation_limit),
            violation_window_secs: std::env::var("VIOLATION_WINDOW_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(current.violation_window_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(current.verbose_logging),
        }
    }
}
