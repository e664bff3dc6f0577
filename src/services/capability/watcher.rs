//! 状态探测 → 变化事件
//!
//! 浏览器侧只能查询当前状态，这里按固定间隔探测，只在状态翻转时投递事件。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::AppResult;
use crate::models::{ProctoringEvent, SessionEvent, SignalKind};

/// 返回当前状态的探测函数
pub type Probe = Arc<dyn Fn() -> BoxFuture<'static, AppResult<bool>> + Send + Sync>;

/// 状态翻转时投递的信号
#[derive(Debug, Clone, Copy)]
pub struct EdgeSignals {
    /// false → true
    pub rising: Option<SignalKind>,
    /// true → false
    pub falling: SignalKind,
    /// 第一次 falling 之后结束探测
    pub stop_after_falling: bool,
}

/// 共享的停止标记，置位后不再投递任何事件
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 投递一条监考事件；已停止时丢弃
pub fn emit(events: &UnboundedSender<SessionEvent>, stop: &StopFlag, kind: SignalKind) -> bool {
    if stop.is_stopped() {
        debug!("监听已停止，丢弃信号 {:?}", kind);
        return false;
    }
    events
        .send(SessionEvent::Proctoring(ProctoringEvent::now(kind)))
        .is_ok()
}

/// 探测循环，直到停止、事件队列关闭或（按配置）第一次 falling
pub async fn watch_edges(
    name: &'static str,
    probe: Probe,
    initial: bool,
    period: Duration,
    signals: EdgeSignals,
    events: UnboundedSender<SessionEvent>,
    stop: StopFlag,
) {
    let mut last = initial;
    loop {
        tokio::time::sleep(period).await;
        if stop.is_stopped() {
            break;
        }

        let current = match probe().await {
            Ok(value) => value,
            Err(e) => {
                debug!("{} 探测失败，跳过本轮: {}", name, e);
                continue;
            }
        };
        if current == last {
            continue;
        }
        last = current;

        let kind = if current {
            match signals.rising {
                Some(kind) => kind,
                None => continue,
            }
        } else {
            signals.falling
        };
        debug!("{} 状态变化 → {:?}", name, kind);
        if !emit(&events, &stop, kind) {
            break;
        }
        if !current && signals.stop_after_falling {
            break;
        }
    }
    debug!("{} 探测结束", name);
}
