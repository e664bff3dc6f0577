/// 监考页面客户端
///
/// 通过在监考页面中执行脚本，提供摄像头、全屏、可见性三种能力。
/// 视频流保存在页面的 `window.__examCamera` 上，只由这里申请和停止。
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::JsExecutor;
use crate::services::{CameraCapability, FullscreenCapability, StreamHandle, VisibilityCapability};

const ACQUIRE_CAMERA_JS: &str = r#"
(async () => {
    try {
        const current = window.__examCamera;
        if (current && current.getVideoTracks().some(t => t.readyState === "live")) {
            return { ok: true, id: current.id };
        }
        const stream = await navigator.mediaDevices.getUserMedia({ video: true });
        window.__examCamera = stream;
        return { ok: true, id: stream.id };
    } catch (err) {
        return { ok: false, error: (err && err.name) ? err.name : String(err) };
    }
})()
"#;

const CAMERA_LIVE_JS: &str = r#"
(() => {
    const stream = window.__examCamera;
    return !!stream && stream.getVideoTracks().some(t => t.readyState === "live");
})()
"#;

const RELEASE_CAMERA_JS: &str = r#"
(() => {
    const stream = window.__examCamera;
    if (stream) {
        stream.getTracks().forEach(t => t.stop());
        window.__examCamera = null;
    }
    return true;
})()
"#;

const REQUEST_FULLSCREEN_JS: &str = r#"
(async () => {
    try {
        if (!document.fullscreenElement) {
            await document.documentElement.requestFullscreen();
        }
        return true;
    } catch (err) {
        return false;
    }
})()
"#;

const IS_FULLSCREEN_JS: &str = "!!document.fullscreenElement";

const EXIT_FULLSCREEN_JS: &str = r#"
(async () => {
    if (document.fullscreenElement) {
        try { await document.exitFullscreen(); } catch (err) {}
    }
    return true;
})()
"#;

const IS_VISIBLE_JS: &str = r#"document.visibilityState === "visible""#;

/// 摄像头申请脚本的返回值
#[derive(Debug, Deserialize)]
struct AcquireResult {
    ok: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AcquireResult {
    fn into_handle(self) -> AppResult<StreamHandle> {
        if self.ok {
            Ok(StreamHandle {
                id: self.id.unwrap_or_default(),
            })
        } else {
            Err(AppError::camera_denied(
                self.error.unwrap_or_else(|| "unknown".to_string()),
            ))
        }
    }
}

/// 监考页面
pub struct ProctorPage {
    executor: Arc<JsExecutor>,
}

impl ProctorPage {
    pub fn new(executor: Arc<JsExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CameraCapability for ProctorPage {
    async fn acquire(&self) -> AppResult<StreamHandle> {
        let result: AcquireResult = self.executor.eval_as(ACQUIRE_CAMERA_JS).await?;
        let handle = result.into_handle()?;
        info!("📷 已获取视频流 {}", handle.id);
        Ok(handle)
    }

    async fn is_live(&self) -> AppResult<bool> {
        self.executor.eval_flag(CAMERA_LIVE_JS).await
    }

    async fn release(&self) -> AppResult<()> {
        self.executor.eval(RELEASE_CAMERA_JS).await?;
        debug!("视频流已停止");
        Ok(())
    }
}

#[async_trait]
impl FullscreenCapability for ProctorPage {
    async fn request_fullscreen(&self) -> AppResult<bool> {
        let entered = self.executor.eval_flag(REQUEST_FULLSCREEN_JS).await?;
        if !entered {
            // 没有用户手势时浏览器会拒绝
            warn!("⚠️ 页面拒绝进入全屏");
        }
        Ok(entered)
    }

    async fn is_fullscreen(&self) -> AppResult<bool> {
        self.executor.eval_flag(IS_FULLSCREEN_JS).await
    }

    async fn exit_fullscreen(&self) -> AppResult<()> {
        self.executor.eval(EXIT_FULLSCREEN_JS).await?;
        Ok(())
    }
}

#[async_trait]
impl VisibilityCapability for ProctorPage {
    async fn is_visible(&self) -> AppResult<bool> {
        self.executor.eval_flag(IS_VISIBLE_JS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[test]
    fn test_acquire_result_mapping() {
        let granted: AcquireResult = serde_json::from_str(r#"{"ok":true,"id":"abc"}"#).unwrap();
        assert_eq!(granted.into_handle().unwrap().id, "abc");

        let denied: AcquireResult =
            serde_json::from_str(r#"{"ok":false,"error":"NotAllowedError"}"#).unwrap();
        match denied.into_handle() {
            Err(AppError::Session(SessionError::CameraDenied { reason })) => {
                assert_eq!(reason, "NotAllowedError")
            }
            other => panic!("unexpected: {:?}", other.map(|h| h.id)),
        }
    }

    /// 需要本地 Chrome 以 --remote-debugging-port=9222 启动，手动运行
    #[tokio::test]
    #[ignore]
    async fn test_probe_live_page() {
        crate::utils::logging::init(true);
        let (_browser, page) = crate::browser::connect_to_browser_and_page(9222, None)
            .await
            .unwrap();
        let proctor = ProctorPage::new(Arc::new(JsExecutor::new(page)));
        println!("visible = {}", proctor.is_visible().await.unwrap());
        println!("fullscreen = {}", proctor.is_fullscreen().await.unwrap());
    }
}
