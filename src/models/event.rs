//! 进入控制器事件队列的所有事件

use chrono::{DateTime, Utc};

use crate::models::question::{OptionLabel, QuestionSet};

/// 监考信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    CameraAcquired,
    CameraLost,
    FullscreenEntered,
    FullscreenExited,
    TabHidden,
    TabVisible,
}

/// 一条监考信号，只在内存中流转，不持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProctoringEvent {
    pub kind: SignalKind,
    pub at: DateTime<Utc>,
}

impl ProctoringEvent {
    pub fn now(kind: SignalKind) -> Self {
        Self {
            kind,
            at: Utc::now(),
        }
    }
}

/// 考生发出的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    GoTo(usize),
    Next,
    Prev,
    Select { index: usize, option: OptionLabel },
    /// 作答控制器处理到此命令时的当前题
    Answer(OptionLabel),
    Submit,
    Quit,
    /// 提交失败后放弃本次会话（草稿保留）
    Leave,
}

/// 提交结果分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success,
    RetryableFailure(String),
    FatalFailure(String),
}

/// 控制器唯一入口接收的事件
#[derive(Debug, Clone)]
pub enum SessionEvent {
    QuestionsLoaded(Result<QuestionSet, String>),
    Proctoring(ProctoringEvent),
    Tick,
    Command(UserCommand),
    SubmissionSettled(SubmissionOutcome),
}
