//! 考试会话控制器 - 流程层
//!
//! 核心职责：会话状态的唯一持有者和唯一修改点
//!
//! 所有输入（题目加载结果、监考信号、倒计时节拍、考生操作、提交结果）
//! 都通过 `dispatch` 串行进入，控制器只修改自身状态并返回要执行的
//! `Directive`，不直接做任何 IO（草稿落盘除外，它必须在返回前完成）。
//!
//! 阶段流转：
//! 1. Bootstrapping：等待题目加载 + 摄像头就绪
//! 2. Active：唯一接受操作和节拍的阶段
//! 3. Finalizing：提交进行中，其他触发一律忽略
//! 4. Completed / Failed：终态；提交失败后允许手动再次提交

use tracing::{debug, error, info, warn};

use crate::models::{
    FailureCause, OptionLabel, Phase, ProctoringEvent, Question, QuestionSet, SessionContext,
    SessionEvent, SignalKind, SubmissionOutcome, SubmissionPayload, SubmitReason, UserCommand,
    ViolationKind, ViolationRecord,
};
use crate::services::{AnswerStore, Countdown, SetOutcome, TickResult};
use crate::utils::logging;
use crate::workflow::palette::{build_palette, PaletteEntry, VisitLedger};
use crate::workflow::violation_policy::{Verdict, ViolationPolicy, ViolationTracker};

pub const MSG_LOAD_FAILED: &str = "Failed to load exam";
pub const MSG_FULLSCREEN_WARNING: &str = "Please stay in full screen during the exam";
pub const MSG_TAB_WARNING: &str = "Tab switching is not allowed during the exam";
pub const MSG_SUBMIT_FAILED: &str = "Submission failed";
pub const MSG_SUBMIT_REJECTED: &str =
    "Submission was rejected and cannot be retried. Your answers are kept on this device";
pub const MSG_CAMERA_REQUIRED: &str = "Camera access is required for this exam";
pub const MSG_VIOLATION_LIMIT: &str = "Too many proctoring violations, submitting exam";
pub const MSG_SUBMITTED: &str = "Exam submitted successfully";
pub const MSG_NOT_ACTIVE: &str = "Exam is not in progress";
pub const MSG_SAVE_FAILED: &str = "Could not save your answer, please try again";

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// 给考生看的非阻塞提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 控制器要求运行层执行的副作用
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// 启动倒计时节拍
    ArmClock,
    /// 停止倒计时节拍
    DisarmClock,
    /// 发起一次提交，结果以 `SubmissionSettled` 回送
    Submit(SubmissionPayload),
    /// 停止全部监考监听
    StopMonitors,
    /// 释放摄像头
    ReleaseCamera,
    /// 退出全屏
    ExitFullscreen,
    Notify(Notice),
}

/// 会话状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub current_index: usize,
    pub phase: Phase,
    /// 提交在途标记，保证同一时间最多一次提交
    pub submission_in_flight: bool,
    /// 首次进入 Finalizing 的原因，重试时沿用
    pub reason: Option<SubmitReason>,
    pub last_violation: Option<ViolationRecord>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_index: 0,
            phase: Phase::Bootstrapping,
            submission_in_flight: false,
            reason: None,
            last_violation: None,
        }
    }
}

/// 给界面层的只读快照
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub remaining_secs: u32,
    pub current_index: usize,
    pub total: usize,
    pub question: Option<Question>,
    pub selected: Option<OptionLabel>,
    pub palette: Vec<PaletteEntry>,
    pub answered: usize,
    pub last_violation: Option<ViolationRecord>,
    pub submitting: bool,
}

/// 考试会话控制器
///
/// - 持有 SessionState、倒计时、题目集合、答题草稿、访问记录
/// - 不持有任何外部资源（页面、网络、摄像头）
/// - 单线程串行调用 `dispatch`
pub struct ExamSessionController {
    ctx: SessionContext,
    questions: Option<QuestionSet>,
    answers: AnswerStore,
    ledger: VisitLedger,
    countdown: Countdown,
    violations: ViolationTracker,
    state: SessionState,
    camera_ready: bool,
    submission_attempts: u32,
}

impl ExamSessionController {
    /// 创建控制器
    ///
    /// # 参数
    /// - `ctx`: 会话上下文（考生身份、考试代码、语言）
    /// - `answers`: 已打开的答题草稿（可能含恢复的答案）
    /// - `budget_secs`: 考试总时长
    /// - `policy`: 非致命违规策略
    pub fn new(ctx: SessionContext, answers: AnswerStore, budget_secs: u32, policy: ViolationPolicy) -> Self {
        Self {
            ctx,
            questions: None,
            answers,
            ledger: VisitLedger::new(),
            countdown: Countdown::new(budget_secs),
            violations: ViolationTracker::new(policy),
            state: SessionState::default(),
            camera_ready: false,
            submission_attempts: 0,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    pub fn questions(&self) -> Option<&QuestionSet> {
        self.questions.as_ref()
    }

    pub fn answers(&self) -> &crate::models::AnswerRecord {
        self.answers.record()
    }

    pub fn violation_count(&self) -> u32 {
        self.violations.total()
    }

    /// 本会话发起过的提交次数
    pub fn submission_attempts(&self) -> u32 {
        self.submission_attempts
    }

    /// 唯一的事件入口
    ///
    /// # 参数
    /// - `event`: 任意来源的会话事件
    ///
    /// # 返回
    /// 需要运行层按顺序执行的副作用
    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<Directive> {
        match event {
            SessionEvent::QuestionsLoaded(result) => self.on_questions_loaded(result),
            SessionEvent::Proctoring(event) => self.on_proctoring(event),
            SessionEvent::Tick => self.on_tick(),
            SessionEvent::Command(command) => self.on_command(command),
            SessionEvent::SubmissionSettled(outcome) => self.on_submission_settled(outcome),
        }
    }

    /// 当前界面快照
    pub fn view(&self) -> SessionView {
        let (total, question, selected, palette) = match &self.questions {
            Some(set) => {
                let question = set.get(self.state.current_index).cloned();
                let selected = question
                    .as_ref()
                    .and_then(|q| self.answers.record().get(q.id));
                let palette = build_palette(
                    set,
                    self.answers.record(),
                    &self.ledger,
                    self.state.current_index,
                );
                (set.len(), question, selected, palette)
            }
            None => (0, None, None, Vec::new()),
        };

        SessionView {
            phase: self.state.phase,
            remaining_secs: self.countdown.remaining_secs(),
            current_index: self.state.current_index,
            total,
            question,
            selected,
            palette,
            answered: self.answered_count(),
            last_violation: self.state.last_violation.clone(),
            submitting: self.state.submission_in_flight,
        }
    }

    fn answered_count(&self) -> usize {
        match &self.questions {
            Some(set) => set
                .iter()
                .filter(|q| self.answers.record().is_answered(q.id))
                .count(),
            None => self.answers.record().len(),
        }
    }

    // ========== 启动 ==========

    fn on_questions_loaded(&mut self, result: Result<QuestionSet, String>) -> Vec<Directive> {
        if self.state.phase != Phase::Bootstrapping {
            debug!("阶段 {} 收到题目加载结果，忽略", self.state.phase);
            return Vec::new();
        }

        let set = match result {
            Ok(set) if !set.is_empty() => set,
            Ok(_) => return self.fail_load("题目列表为空"),
            Err(e) => return self.fail_load(&e),
        };

        info!("📚 题目加载完成: {} 道题", set.len());
        match self.answers.retain_known(&set) {
            Ok(_) => {}
            Err(e) => warn!("⚠️ 过滤草稿失败，保留原草稿: {}", e),
        }
        self.questions = Some(set);
        self.try_activate()
    }

    fn fail_load(&mut self, detail: &str) -> Vec<Directive> {
        error!("❌ 题目加载失败: {}", detail);
        self.transition(Phase::Failed(FailureCause::LoadError));
        vec![
            Directive::StopMonitors,
            Directive::ReleaseCamera,
            Directive::Notify(Notice::error(MSG_LOAD_FAILED)),
        ]
    }

    /// 题目和摄像头都就绪后进入 Active
    fn try_activate(&mut self) -> Vec<Directive> {
        if self.state.phase != Phase::Bootstrapping || !self.camera_ready {
            return Vec::new();
        }
        let Some(set) = &self.questions else {
            return Vec::new();
        };

        let first = set.clamp_index(0);
        self.state.current_index = first;
        self.ledger.visit(first);
        self.countdown.arm();
        self.transition(Phase::Active);
        vec![Directive::ArmClock]
    }

    // ========== 监考信号 ==========

    fn on_proctoring(&mut self, event: ProctoringEvent) -> Vec<Directive> {
        let phase = self.state.phase;
        match event.kind {
            SignalKind::CameraAcquired => {
                if phase != Phase::Bootstrapping {
                    debug!("阶段 {} 收到摄像头就绪，忽略", phase);
                    return Vec::new();
                }
                info!("📷 摄像头已就绪");
                self.camera_ready = true;
                self.try_activate()
            }
            SignalKind::CameraLost => {
                if !matches!(phase, Phase::Bootstrapping | Phase::Active) {
                    debug!("阶段 {} 收到摄像头断开，忽略", phase);
                    return Vec::new();
                }
                error!("📷 摄像头不可用，强制交卷");
                self.camera_ready = false;
                let mut directives = vec![Directive::Notify(Notice::error(MSG_CAMERA_REQUIRED))];
                directives.extend(self.finalize(SubmitReason::CameraDenied));
                directives
            }
            SignalKind::FullscreenExited => self.on_violation(ViolationKind::FullscreenExit, event),
            SignalKind::TabHidden => self.on_violation(ViolationKind::TabHidden, event),
            SignalKind::FullscreenEntered | SignalKind::TabVisible => {
                debug!("监考信号恢复: {:?}", event.kind);
                Vec::new()
            }
        }
    }

    fn on_violation(&mut self, kind: ViolationKind, event: ProctoringEvent) -> Vec<Directive> {
        if self.state.phase != Phase::Active {
            debug!("阶段 {} 收到违规信号 {:?}，忽略", self.state.phase, kind);
            return Vec::new();
        }

        let verdict = self.violations.record(kind, event.at);
        self.state.last_violation = self.violations.last().cloned();
        warn!(
            "⚠️ 监考违规: {:?}（累计 {} 次）",
            kind,
            self.violations.total()
        );

        let message = match kind {
            ViolationKind::FullscreenExit => MSG_FULLSCREEN_WARNING,
            ViolationKind::TabHidden => MSG_TAB_WARNING,
        };
        let mut directives = vec![Directive::Notify(Notice::warning(message))];

        if verdict == Verdict::Fatal {
            error!("🚫 违规次数达到上限，强制交卷");
            directives.push(Directive::Notify(Notice::error(MSG_VIOLATION_LIMIT)));
            directives.extend(self.finalize(SubmitReason::ViolationLimit));
        }
        directives
    }

    // ========== 倒计时 ==========

    fn on_tick(&mut self) -> Vec<Directive> {
        if self.state.phase != Phase::Active {
            return Vec::new();
        }
        match self.countdown.tick() {
            TickResult::Expired => {
                info!("⏰ 考试时间到");
                self.finalize(SubmitReason::TimeExpired)
            }
            TickResult::Remaining(_) | TickResult::Idle => Vec::new(),
        }
    }

    // ========== 考生操作 ==========

    fn on_command(&mut self, command: UserCommand) -> Vec<Directive> {
        match command {
            UserCommand::Submit if self.state.phase.can_retry_submission() => {
                let reason = self.state.reason.unwrap_or(SubmitReason::ManualSubmit);
                info!("🔁 考生手动重试提交（原因: {}）", reason);
                self.finalize(reason)
            }
            UserCommand::Leave => {
                debug!("考生离开会话，阶段 {}", self.state.phase);
                Vec::new()
            }
            _ if self.state.phase != Phase::Active => {
                debug!("阶段 {} 不接受操作 {:?}", self.state.phase, command);
                vec![Directive::Notify(Notice::info(MSG_NOT_ACTIVE))]
            }
            UserCommand::GoTo(index) => {
                self.go_to(index);
                Vec::new()
            }
            UserCommand::Next => {
                self.go_to(self.state.current_index.saturating_add(1));
                Vec::new()
            }
            UserCommand::Prev => {
                self.go_to(self.state.current_index.saturating_sub(1));
                Vec::new()
            }
            UserCommand::Select { index, option } => self.select(index, option),
            UserCommand::Answer(option) => self.select(self.state.current_index, option),
            UserCommand::Submit => self.finalize(SubmitReason::ManualSubmit),
            UserCommand::Quit => self.finalize(SubmitReason::Quit),
        }
    }

    /// 跳转到指定题目，下标越界时夹到边界
    fn go_to(&mut self, index: usize) {
        let Some(set) = &self.questions else {
            return;
        };
        let target = set.clamp_index(index);
        self.state.current_index = target;
        self.ledger.visit(target);
        debug!("跳转到第 {} 题", target + 1);
    }

    /// 作答，返回前已落盘
    fn select(&mut self, index: usize, option: OptionLabel) -> Vec<Directive> {
        let Some(question_id) = self
            .questions
            .as_ref()
            .and_then(|set| set.get(index))
            .map(|q| q.id)
        else {
            warn!("⚠️ 第 {} 题不存在，忽略作答", index + 1);
            return Vec::new();
        };

        match self.answers.set(question_id, option) {
            Ok(SetOutcome::Changed(_)) => {
                debug!("第 {} 题作答 {}", index + 1, option);
                Vec::new()
            }
            Ok(SetOutcome::Unchanged) => Vec::new(),
            Err(e) => {
                error!("❌ 保存答案失败: {}", e);
                vec![Directive::Notify(Notice::error(MSG_SAVE_FAILED))]
            }
        }
    }

    // ========== 提交 ==========

    /// 进入 Finalizing 并发起唯一一次提交
    ///
    /// 已有提交在途或所处阶段不允许提交时为空操作。
    fn finalize(&mut self, reason: SubmitReason) -> Vec<Directive> {
        let phase = self.state.phase;
        let allowed = matches!(phase, Phase::Bootstrapping | Phase::Active) || phase.can_retry_submission();
        if self.state.submission_in_flight || !allowed {
            debug!("阶段 {} 已有提交在途或不可提交，忽略触发 ({})", phase, reason);
            return Vec::new();
        }

        let reason = *self.state.reason.get_or_insert(reason);
        self.state.submission_in_flight = true;
        self.submission_attempts += 1;
        self.countdown.disarm();
        self.transition(Phase::Finalizing);

        let payload = SubmissionPayload::build(
            &self.ctx,
            self.questions.as_ref(),
            self.answers.record(),
            self.countdown.elapsed_secs(),
            reason,
        );
        info!(
            "📝 进入交卷 (第 {} 次): {} 道作答, 用时 {} 分钟, 原因 {}",
            self.submission_attempts,
            payload.answers.len(),
            payload.time_taken_minutes,
            reason
        );

        vec![Directive::DisarmClock, Directive::Submit(payload)]
    }

    fn on_submission_settled(&mut self, outcome: SubmissionOutcome) -> Vec<Directive> {
        if self.state.phase != Phase::Finalizing || !self.state.submission_in_flight {
            warn!("⚠️ 阶段 {} 收到意外的提交结果，忽略", self.state.phase);
            return Vec::new();
        }
        self.state.submission_in_flight = false;

        match outcome {
            SubmissionOutcome::Success => {
                info!("✅ 提交成功");
                self.transition(Phase::Completed);
                if let Err(e) = self.answers.clear() {
                    warn!("⚠️ 清除草稿失败: {}", e);
                }
                vec![
                    Directive::StopMonitors,
                    Directive::ReleaseCamera,
                    Directive::ExitFullscreen,
                    Directive::Notify(Notice::info(MSG_SUBMITTED)),
                ]
            }
            SubmissionOutcome::RetryableFailure(detail) => {
                error!("❌ 提交失败（可重试）: {}", detail);
                self.transition(Phase::Failed(FailureCause::SubmissionRetryable));
                vec![
                    Directive::StopMonitors,
                    Directive::Notify(Notice::error(MSG_SUBMIT_FAILED)),
                ]
            }
            SubmissionOutcome::FatalFailure(detail) => {
                error!("❌ 提交被拒绝: {}", detail);
                self.transition(Phase::Failed(FailureCause::SubmissionRejected));
                vec![
                    Directive::StopMonitors,
                    Directive::ReleaseCamera,
                    Directive::Notify(Notice::error(MSG_SUBMIT_REJECTED)),
                ]
            }
        }
    }

    fn transition(&mut self, to: Phase) {
        let from = self.state.phase;
        if from != to {
            logging::log_phase_change(from, to);
            self.state.phase = to;
        }
    }
}
