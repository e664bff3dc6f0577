use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::watcher::{watch_edges, EdgeSignals, Probe, StopFlag};
use super::FullscreenCapability;
use crate::models::{SessionEvent, SignalKind};

/// 全屏监控：开考时尝试进入全屏（失败不致命），之后报告离开/回到全屏
pub struct FullscreenMonitor {
    fullscreen: Arc<dyn FullscreenCapability>,
    stop: StopFlag,
    handle: Option<JoinHandle<()>>,
}

impl FullscreenMonitor {
    pub fn new(fullscreen: Arc<dyn FullscreenCapability>) -> Self {
        Self {
            fullscreen,
            stop: StopFlag::new(),
            handle: None,
        }
    }

    pub fn start(&mut self, events: UnboundedSender<SessionEvent>, period: Duration) {
        if self.handle.is_some() {
            return;
        }
        let fullscreen = self.fullscreen.clone();
        let stop = self.stop.clone();

        self.handle = Some(tokio::spawn(async move {
            match fullscreen.request_fullscreen().await {
                Ok(true) => info!("🖥 已进入全屏"),
                Ok(false) => warn!("⚠️ 浏览器拒绝进入全屏，继续考试"),
                Err(e) => warn!("⚠️ 请求全屏失败，继续考试: {}", e),
            }
            let initial = fullscreen.is_fullscreen().await.unwrap_or(false);

            let probe_target = fullscreen.clone();
            let probe: Probe = Arc::new(move || {
                let fullscreen = probe_target.clone();
                async move { fullscreen.is_fullscreen().await }.boxed()
            });
            watch_edges(
                "全屏",
                probe,
                initial,
                period,
                EdgeSignals {
                    rising: Some(SignalKind::FullscreenEntered),
                    falling: SignalKind::FullscreenExited,
                    stop_after_falling: false,
                },
                events,
                stop,
            )
            .await;
        }));
    }

    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// 会话正常结束后退出全屏（尽力而为）
    pub async fn exit(&self) {
        if let Err(e) = self.fullscreen.exit_fullscreen().await {
            debug!("退出全屏失败: {}", e);
        }
    }
}
