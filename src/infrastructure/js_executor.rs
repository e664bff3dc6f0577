//! JS 执行器 - 基础设施层
//!
//! 持有唯一的监考页面，只暴露"在页面里执行脚本"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppResult, BrowserError};
use crate::utils::logging::truncate_text;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识摄像头 / 全屏 / 可见性，只负责执行
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行脚本并返回 JSON 结果（Promise 会被等待）
    pub async fn eval(&self, script: impl Into<String>) -> AppResult<JsonValue> {
        let script = script.into();
        let result = self.page.evaluate(script.as_str()).await?;
        let value: JsonValue = result.into_value().map_err(|e| BrowserError::UnexpectedScriptResult {
            script: truncate_text(script.trim(), 60),
            detail: e.to_string(),
        })?;
        debug!("脚本返回: {}", value);
        Ok(value)
    }

    /// 执行脚本并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, script: impl Into<String>) -> AppResult<T> {
        let value = self.eval(script).await?;
        let typed = serde_json::from_value(value)?;
        Ok(typed)
    }

    /// 执行返回布尔值的探测脚本
    pub async fn eval_flag(&self, script: impl Into<String>) -> AppResult<bool> {
        let script = script.into();
        match self.eval(script.as_str()).await? {
            JsonValue::Bool(flag) => Ok(flag),
            other => Err(BrowserError::UnexpectedScriptResult {
                script: truncate_text(script.trim(), 60),
                detail: format!("期望布尔值，实际为 {}", other),
            }
            .into()),
        }
    }
}
