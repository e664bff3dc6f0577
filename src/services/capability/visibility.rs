use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::watcher::{watch_edges, EdgeSignals, Probe, StopFlag};
use super::VisibilityCapability;
use crate::models::{SessionEvent, SignalKind};

/// 标签页可见性监控
pub struct VisibilityMonitor {
    visibility: Arc<dyn VisibilityCapability>,
    stop: StopFlag,
    handle: Option<JoinHandle<()>>,
}

impl VisibilityMonitor {
    pub fn new(visibility: Arc<dyn VisibilityCapability>) -> Self {
        Self {
            visibility,
            stop: StopFlag::new(),
            handle: None,
        }
    }

    pub fn start(&mut self, events: UnboundedSender<SessionEvent>, period: Duration) {
        if self.handle.is_some() {
            return;
        }
        let visibility = self.visibility.clone();
        let stop = self.stop.clone();

        self.handle = Some(tokio::spawn(async move {
            let initial = visibility.is_visible().await.unwrap_or(true);
            let probe: Probe = Arc::new(move || {
                let visibility = visibility.clone();
                async move { visibility.is_visible().await }.boxed()
            });
            watch_edges(
                "可见性",
                probe,
                initial,
                period,
                EdgeSignals {
                    rising: Some(SignalKind::TabVisible),
                    falling: SignalKind::TabHidden,
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
}
