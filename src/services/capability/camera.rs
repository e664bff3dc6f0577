use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::watcher::{emit, watch_edges, EdgeSignals, Probe, StopFlag};
use super::{CameraCapability, StreamHandle};
use crate::error::AppResult;
use crate::models::{SessionEvent, SignalKind};

/// 摄像头流的生命周期
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    NotAcquired,
    Denied,
    Live(StreamHandle),
    Released,
}

/// 摄像头监控：获取唯一的视频流，检测中途丢失，会话结束时释放一次
pub struct CameraMonitor {
    camera: Arc<dyn CameraCapability>,
    state: Arc<Mutex<CameraState>>,
    stop: StopFlag,
    handle: Option<JoinHandle<()>>,
}

impl CameraMonitor {
    pub fn new(camera: Arc<dyn CameraCapability>) -> Self {
        Self {
            camera,
            state: Arc::new(Mutex::new(CameraState::NotAcquired)),
            stop: StopFlag::new(),
            handle: None,
        }
    }

    pub fn state(&self) -> CameraState {
        lock_state(&self.state).clone()
    }

    /// 当前视频流（只读，供预览使用）
    pub fn preview(&self) -> Option<StreamHandle> {
        match &*lock_state(&self.state) {
            CameraState::Live(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// 申请摄像头并开始检测流是否存活
    pub fn start(&mut self, events: UnboundedSender<SessionEvent>, period: Duration) {
        if self.handle.is_some() {
            return;
        }
        let camera = self.camera.clone();
        let state = self.state.clone();
        let stop = self.stop.clone();

        self.handle = Some(tokio::spawn(async move {
            info!("📷 正在申请摄像头权限...");
            let handle = match camera.acquire().await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("❌ 摄像头不可用: {}", e);
                    *lock_state(&state) = CameraState::Denied;
                    emit(&events, &stop, SignalKind::CameraLost);
                    return;
                }
            };

            // 等待期间会话可能已经结束并要求释放
            let released_meanwhile = {
                let mut guard = lock_state(&state);
                if *guard == CameraState::Released {
                    true
                } else {
                    *guard = CameraState::Live(handle.clone());
                    false
                }
            };
            if released_meanwhile {
                info!("📷 会话已结束，立即释放刚获取的视频流");
                if let Err(e) = camera.release().await {
                    error!("释放摄像头失败: {}", e);
                }
                return;
            }

            info!("✓ 摄像头已就绪 (stream: {})", handle.id);
            if !emit(&events, &stop, SignalKind::CameraAcquired) {
                return;
            }

            let probe_camera = camera.clone();
            let probe: Probe = Arc::new(move || {
                let camera = probe_camera.clone();
                async move { camera.is_live().await }.boxed()
            });
            watch_edges(
                "摄像头",
                probe,
                true,
                period,
                EdgeSignals {
                    rising: None,
                    falling: SignalKind::CameraLost,
                    stop_after_falling: true,
                },
                events,
                stop,
            )
            .await;
        }));
    }

    /// 停止投递事件；正在进行的申请会继续完成以便随后释放
    pub fn stop(&mut self) {
        self.stop.stop();
        self.handle = None;
    }

    /// 释放视频流；未获取或已释放时什么都不做
    pub async fn release(&self) -> AppResult<()> {
        let previous = std::mem::replace(&mut *lock_state(&self.state), CameraState::Released);
        match previous {
            CameraState::Live(handle) => {
                info!("📷 释放摄像头 (stream: {})", handle.id);
                self.camera.release().await
            }
            CameraState::Denied => {
                *lock_state(&self.state) = CameraState::Denied;
                Ok(())
            }
            CameraState::NotAcquired | CameraState::Released => Ok(()),
        }
    }
}

fn lock_state(state: &Mutex<CameraState>) -> std::sync::MutexGuard<'_, CameraState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
