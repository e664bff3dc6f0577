//! 非致命违规（离开全屏、切换标签页）的处理策略
//!
//! 默认只警告。配置了上限时，窗口期内达到上限即强制交卷。

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::models::{ViolationKind, ViolationRecord};

/// 策略配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationPolicy {
    pub limit: Option<u32>,
    pub window: Duration,
}

impl ViolationPolicy {
    /// 只警告，永不强制交卷
    pub fn warn_only() -> Self {
        Self {
            limit: None,
            window: Duration::minutes(5),
        }
    }

    pub fn with_limit(limit: u32, window: Duration) -> Self {
        Self {
            limit: Some(limit),
            window,
        }
    }
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        Self::warn_only()
    }
}

/// 单次违规的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Tolerated,
    Fatal,
}

/// 违规记录器
#[derive(Debug, Clone)]
pub struct ViolationTracker {
    policy: ViolationPolicy,
    recent: VecDeque<DateTime<Utc>>,
    total: u32,
    last: Option<ViolationRecord>,
}

impl ViolationTracker {
    pub fn new(policy: ViolationPolicy) -> Self {
        Self {
            policy,
            recent: VecDeque::new(),
            total: 0,
            last: None,
        }
    }

    pub fn record(&mut self, kind: ViolationKind, at: DateTime<Utc>) -> Verdict {
        self.total += 1;
        self.last = Some(ViolationRecord {
            kind,
            at,
            total: self.total,
        });

        let Some(limit) = self.policy.limit else {
            return Verdict::Tolerated;
        };

        self.recent.push_back(at);
        let window_start = at - self.policy.window;
        while self.recent.front().is_some_and(|t| *t < window_start) {
            self.recent.pop_front();
        }

        if self.recent.len() as u32 >= limit {
            Verdict::Fatal
        } else {
            Verdict::Tolerated
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn last(&self) -> Option<&ViolationRecord> {
        self.last.as_ref()
    }
}
