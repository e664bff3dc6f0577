//! 监考能力监控 - 业务能力层
//!
//! 把三路互不相关、各自可能失败的信号源（摄像头、全屏、标签页可见性）
//! 统一成投递到控制器事件队列的 `ProctoringEvent`。
//!
//! - 每个子监控可以单独启动/停止
//! - 监控寿命覆盖 Active + Finalizing，会话结束时全部停止
//! - 视频流只由这里申请和释放，对外只读暴露

pub mod camera;
pub mod fullscreen;
pub mod visibility;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::error::AppResult;
use crate::models::SessionEvent;

pub use camera::{CameraMonitor, CameraState};
pub use fullscreen::FullscreenMonitor;
pub use visibility::VisibilityMonitor;

/// 已获取的视频流句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub id: String,
}

/// 摄像头能力
#[async_trait]
pub trait CameraCapability: Send + Sync {
    /// 申请独占的视频采集；被拒绝时返回错误
    async fn acquire(&self) -> AppResult<StreamHandle>;
    /// 已获取的流是否仍在采集
    async fn is_live(&self) -> AppResult<bool>;
    /// 停止采集
    async fn release(&self) -> AppResult<()>;
}

/// 全屏能力
#[async_trait]
pub trait FullscreenCapability: Send + Sync {
    /// 请求进入全屏，返回是否成功
    async fn request_fullscreen(&self) -> AppResult<bool>;
    async fn is_fullscreen(&self) -> AppResult<bool>;
    async fn exit_fullscreen(&self) -> AppResult<()>;
}

/// 页面可见性能力
#[async_trait]
pub trait VisibilityCapability: Send + Sync {
    async fn is_visible(&self) -> AppResult<bool>;
}

/// 三路监考信号的统一入口
pub struct CapabilityMonitor {
    camera: CameraMonitor,
    fullscreen: FullscreenMonitor,
    visibility: VisibilityMonitor,
    probe_interval: Duration,
}

impl CapabilityMonitor {
    pub fn new(
        camera: Arc<dyn CameraCapability>,
        fullscreen: Arc<dyn FullscreenCapability>,
        visibility: Arc<dyn VisibilityCapability>,
        probe_interval: Duration,
    ) -> Self {
        Self {
            camera: CameraMonitor::new(camera),
            fullscreen: FullscreenMonitor::new(fullscreen),
            visibility: VisibilityMonitor::new(visibility),
            probe_interval,
        }
    }

    /// 启动全部子监控
    pub fn start(&mut self, events: UnboundedSender<SessionEvent>) {
        info!("🛡 启动监考: 摄像头 / 全屏 / 标签页");
        self.camera.start(events.clone(), self.probe_interval);
        self.fullscreen.start(events.clone(), self.probe_interval);
        self.visibility.start(events, self.probe_interval);
    }

    /// 停止全部监听，不再向控制器投递事件
    pub fn stop_watchers(&mut self) {
        self.camera.stop();
        self.fullscreen.stop();
        self.visibility.stop();
        info!("🛡 监考监听已全部停止");
    }

    /// 释放摄像头，可重复调用
    pub async fn release_camera(&self) {
        if let Err(e) = self.camera.release().await {
            error!("释放摄像头失败: {}", e);
        }
    }

    pub async fn exit_fullscreen(&self) {
        self.fullscreen.exit().await;
    }

    pub fn camera_state(&self) -> CameraState {
        self.camera.state()
    }

    /// 视频流只读句柄，供界面预览
    pub fn preview(&self) -> Option<StreamHandle> {
        self.camera.preview()
    }
}
