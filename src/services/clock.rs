//! 倒计时 - 业务能力层
//!
//! `Countdown` 是纯状态，归控制器所有；`Ticker` 是驱动它的每秒节拍任务。

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::models::SessionEvent;

/// 单次节拍的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// 未启动，节拍被忽略
    Idle,
    /// 剩余秒数
    Remaining(u32),
    /// 刚好归零，整个会话只会出现一次
    Expired,
}

/// 可暂停、可重启的倒计时
#[derive(Debug, Clone)]
pub struct Countdown {
    budget_secs: u32,
    remaining_secs: u32,
    armed: bool,
    expired_signalled: bool,
}

impl Countdown {
    pub fn new(budget_secs: u32) -> Self {
        Self {
            budget_secs,
            remaining_secs: budget_secs,
            armed: false,
            expired_signalled: false,
        }
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.budget_secs - self.remaining_secs
    }

    /// 走一秒；剩余时间永不为负，归零信号只发一次
    pub fn tick(&mut self) -> TickResult {
        if !self.armed {
            return TickResult::Idle;
        }
        if self.remaining_secs == 0 {
            if self.expired_signalled {
                return TickResult::Idle;
            }
            self.expired_signalled = true;
            return TickResult::Expired;
        }

        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            self.expired_signalled = true;
            TickResult::Expired
        } else {
            TickResult::Remaining(self.remaining_secs)
        }
    }
}

/// 每秒向事件队列投递一次 `Tick`
pub struct Ticker {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// 启动节拍；已启动时不重复启动
    pub fn arm(&mut self, events: UnboundedSender<SessionEvent>) {
        if self.handle.is_some() {
            return;
        }
        let period = self.period;
        debug!("⏱ 节拍启动，周期 {:?}", period);

        self.handle = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if events.send(SessionEvent::Tick).is_err() {
                    break;
                }
            }
        }));
    }

    /// 停止节拍，倒计时状态不受影响
    pub fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("⏱ 节拍停止");
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_idle_until_armed() {
        let mut clock = Countdown::new(3);
        assert_eq!(clock.tick(), TickResult::Idle);
        assert_eq!(clock.remaining_secs(), 3);
    }

    #[test]
    fn test_expires_exactly_once_and_clamps() {
        let mut clock = Countdown::new(3);
        clock.arm();
        assert_eq!(clock.tick(), TickResult::Remaining(2));
        assert_eq!(clock.tick(), TickResult::Remaining(1));
        assert_eq!(clock.tick(), TickResult::Expired);
        for _ in 0..5 {
            assert_eq!(clock.tick(), TickResult::Idle);
        }
        assert_eq!(clock.remaining_secs(), 0);
        assert_eq!(clock.elapsed_secs(), 3);
    }

    #[test]
    fn test_disarm_pauses_without_reset() {
        let mut clock = Countdown::new(10);
        clock.arm();
        clock.tick();
        clock.disarm();
        assert_eq!(clock.tick(), TickResult::Idle);
        clock.arm();
        assert_eq!(clock.tick(), TickResult::Remaining(8));
    }

    #[test]
    fn test_zero_budget_expires_on_first_tick() {
        let mut clock = Countdown::new(0);
        clock.arm();
        assert_eq!(clock.tick(), TickResult::Expired);
        assert_eq!(clock.tick(), TickResult::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_emits_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new();
        ticker.arm(tx.clone());
        ticker.arm(tx);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        ticker.disarm();

        let mut ticks = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, SessionEvent::Tick));
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert!(!ticker.is_armed());
    }
}
