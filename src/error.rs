use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 考试会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 脚本返回值不符合预期
    #[error("脚本返回值无法解析 ({script}): {detail}")]
    UnexpectedScriptResult { script: String, detail: String },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 请求超时
    #[error("API请求超时 ({endpoint}), 超时时间: {timeout_secs}秒")]
    Timeout { endpoint: String, timeout_secs: u64 },
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回非 2xx 响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    /// 服务端是否明确拒绝了请求内容（重试无意义）
    pub fn is_permanent_rejection(&self) -> bool {
        matches!(
            self,
            ApiError::BadResponse {
                status: 400 | 413 | 422,
                ..
            }
        )
    }
}

/// 持久化存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取失败
    #[error("读取存储失败 (key: {key}): {source}")]
    ReadFailed {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入失败
    #[error("写入存储失败 (key: {key}): {source}")]
    WriteFailed {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 删除失败
    #[error("删除存储失败 (key: {key}): {source}")]
    DeleteFailed {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 存储内容已损坏
    #[error("存储内容无法解析 (key: {key}): {detail}")]
    Corrupted { key: String, detail: String },
}

/// 考试会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 缺少考生信息
    #[error("缺少考生信息字段: {field}，请先完成考生信息登记")]
    MissingCandidate { field: &'static str },
    /// 手机号格式错误
    #[error("手机号格式不正确: {mobile}")]
    InvalidMobile { mobile: String },
    /// 选项不是 A-D
    #[error("无效的选项: {option}，只允许 A/B/C/D")]
    InvalidOption { option: String },
    /// 题目列表为空
    #[error("考试 {exam_code} 没有任何题目")]
    NoQuestions { exam_code: String },
    /// 摄像头不可用
    #[error("摄像头不可用: {reason}")]
    CameraDenied { reason: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 缺少必填配置
    #[error("缺少必填配置: {name}")]
    Missing { name: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::FileParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建存储读取错误
    pub fn storage_read_failed(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::ReadFailed {
            key: key.into(),
            source: Box::new(source),
        })
    }

    /// 创建存储写入错误
    pub fn storage_write_failed(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::WriteFailed {
            key: key.into(),
            source: Box::new(source),
        })
    }

    /// 创建存储删除错误
    pub fn storage_delete_failed(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::DeleteFailed {
            key: key.into(),
            source: Box::new(source),
        })
    }

    /// 创建摄像头拒绝错误
    pub fn camera_denied(reason: impl Into<String>) -> Self {
        AppError::Session(SessionError::CameraDenied {
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
