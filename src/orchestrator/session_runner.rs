//! 会话运行器 - 编排层
//!
//! ## 职责
//!
//! 把控制器放进一个真正的异步环境里运行：
//!
//! 1. **启动**：并发发起题目加载和监考监听
//! 2. **事件循环**：一个事件队列 + 考生命令通道，串行交给控制器
//! 3. **执行副作用**：按控制器返回的 `Directive` 启停节拍、提交、释放资源
//! 4. **收尾**：停止一切后台任务，输出统计
//!
//! 控制器是同步的，运行器只做调度，不做任何业务判断。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::models::{Phase, SessionEvent, SubmitReason, UserCommand};
use crate::services::{load_question_set, CapabilityMonitor, QuestionSource, SubmissionService, Ticker};
use crate::utils::logging;
use crate::workflow::{Directive, ExamSessionController, Notice, NoticeLevel, SessionView};

/// 界面层接口
pub trait Presenter {
    /// 每处理完一个事件调用一次
    fn render(&mut self, view: &SessionView);
    fn notify(&mut self, notice: &Notice);
}

/// 会话运行所需的外部协作者
pub struct SessionDeps {
    pub questions: Arc<dyn QuestionSource>,
    pub submission: Arc<SubmissionService>,
    pub monitor: CapabilityMonitor,
}

/// 会话结束报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub phase: Phase,
    pub reason: Option<SubmitReason>,
    pub answered: usize,
    pub total: usize,
    pub violations: u32,
    pub submission_attempts: u32,
}

/// 会话运行器
pub struct SessionRunner {
    controller: ExamSessionController,
    deps: SessionDeps,
    ticker: Ticker,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    phase_tx: watch::Sender<Phase>,
}

impl SessionRunner {
    pub fn new(controller: ExamSessionController, deps: SessionDeps) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (phase_tx, _) = watch::channel(controller.phase());
        Self {
            controller,
            deps,
            ticker: Ticker::new(),
            events_tx,
            events_rx,
            phase_tx,
        }
    }

    /// 修改节拍周期（默认 1 秒）
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.ticker = Ticker::with_period(period);
        self
    }

    /// 订阅阶段变化
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    /// 运行整个会话直到结束
    ///
    /// # 参数
    /// - `commands`: 考生命令通道；关闭后会话继续，直到时间耗尽或进入终态
    /// - `presenter`: 界面层
    ///
    /// # 返回
    /// 返回会话结束报告
    pub async fn run<P: Presenter + ?Sized>(
        mut self,
        mut commands: UnboundedReceiver<UserCommand>,
        presenter: &mut P,
    ) -> SessionReport {
        self.bootstrap();
        presenter.render(&self.controller.view());

        let mut commands_open = true;
        loop {
            let event = tokio::select! {
                Some(event) = self.events_rx.recv() => event,
                command = commands.recv(), if commands_open => match command {
                    Some(command) => SessionEvent::Command(command),
                    None => {
                        debug!("命令通道已关闭");
                        commands_open = false;
                        if self.should_stop(false) {
                            break;
                        }
                        continue;
                    }
                },
                else => break,
            };

            let leaving = matches!(event, SessionEvent::Command(UserCommand::Leave));
            let directives = self.controller.dispatch(event);
            self.apply(directives, presenter).await;

            let phase = self.controller.phase();
            self.phase_tx.send_if_modified(|current| {
                if *current != phase {
                    *current = phase;
                    true
                } else {
                    false
                }
            });
            presenter.render(&self.controller.view());

            if self.should_stop(leaving || !commands_open) {
                break;
            }
        }

        self.teardown().await
    }

    /// 并发发起题目加载和监考监听
    fn bootstrap(&mut self) {
        logging::log_session_start(self.controller.context(), self.controller.remaining_secs());

        let source = self.deps.questions.clone();
        let ctx = self.controller.context().clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = load_question_set(source.as_ref(), &ctx)
                .await
                .map_err(|e| e.to_string());
            if events.send(SessionEvent::QuestionsLoaded(result)).is_err() {
                debug!("会话已结束，丢弃题目加载结果");
            }
        });

        self.deps.monitor.start(self.events_tx.clone());
    }

    /// 按顺序执行副作用
    async fn apply<P: Presenter + ?Sized>(&mut self, directives: Vec<Directive>, presenter: &mut P) {
        for directive in directives {
            match directive {
                Directive::ArmClock => self.ticker.arm(self.events_tx.clone()),
                Directive::DisarmClock => self.ticker.disarm(),
                Directive::Submit(payload) => {
                    let service = self.deps.submission.clone();
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let outcome = service.submit(&payload).await;
                        if events.send(SessionEvent::SubmissionSettled(outcome)).is_err() {
                            error!("❌ 会话已结束，提交结果无法送达");
                        }
                    });
                }
                Directive::StopMonitors => self.deps.monitor.stop_watchers(),
                Directive::ReleaseCamera => self.deps.monitor.release_camera().await,
                Directive::ExitFullscreen => self.deps.monitor.exit_fullscreen().await,
                Directive::Notify(notice) => {
                    match notice.level {
                        NoticeLevel::Info => info!("💬 {}", notice.message),
                        NoticeLevel::Warning => warn!("💬 {}", notice.message),
                        NoticeLevel::Error => error!("💬 {}", notice.message),
                    }
                    presenter.notify(&notice);
                }
            }
        }
    }

    /// 是否结束事件循环
    ///
    /// 终态直接结束；可重试的提交失败后等待考生重试，
    /// 直到考生离开或命令通道关闭。
    fn should_stop(&self, no_more_input: bool) -> bool {
        let phase = self.controller.phase();
        if phase.can_retry_submission() {
            no_more_input
        } else {
            phase.is_terminal()
        }
    }

    async fn teardown(mut self) -> SessionReport {
        self.ticker.disarm();
        self.deps.monitor.stop_watchers();
        self.deps.monitor.release_camera().await;

        let view = self.controller.view();
        let report = SessionReport {
            phase: self.controller.phase(),
            reason: self.controller.state().reason,
            answered: view.answered,
            total: view.total,
            violations: self.controller.violation_count(),
            submission_attempts: self.controller.submission_attempts(),
        };
        logging::print_final_summary(report.phase, report.answered, report.total, report.violations);
        report
    }
}
