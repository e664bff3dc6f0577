use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use proctored_exam::error::{ApiError, AppError, AppResult};
use proctored_exam::infrastructure::{DurableStore, FileStore, MemoryStore};
use proctored_exam::models::{
    CandidateInfo, FailureCause, OptionLabel, Phase, Question, SessionContext, SubmissionPayload,
    SubmitReason, SubmittedAnswer, UserCommand,
};
use proctored_exam::orchestrator::{Presenter, SessionDeps, SessionReport, SessionRunner};
use proctored_exam::services::{
    AnswerStore, CameraCapability, CapabilityMonitor, FullscreenCapability, QuestionSource,
    StreamHandle, SubmissionEndpoint, SubmissionService, VisibilityCapability,
};
use proctored_exam::workflow::{ExamSessionController, Notice, SessionView, ViolationPolicy};

// ========== 测试替身 ==========

struct FakeQuestions {
    questions: Vec<Question>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeQuestions {
    fn with_ids(ids: &[u64]) -> Self {
        Self {
            questions: ids
                .iter()
                .map(|id| Question {
                    id: *id,
                    question_text: format!("Question {}", id),
                    option_a: "A".to_string(),
                    option_b: "B".to_string(),
                    option_c: "C".to_string(),
                    option_d: "D".to_string(),
                })
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_ids(&[])
        }
    }
}

#[async_trait]
impl QuestionSource for FakeQuestions {
    async fn fetch_questions(&self, _ctx: &SessionContext) -> AppResult<Vec<Question>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ApiError::BadResponse {
                endpoint: "api/exam/questions".to_string(),
                status: 500,
                message: None,
            }
            .into());
        }
        Ok(self.questions.clone())
    }
}

/// 记录每次提交，按预设顺序返回结果（用完后一律成功）
#[derive(Default)]
struct RecordingEndpoint {
    payloads: Mutex<Vec<SubmissionPayload>>,
    responses: Mutex<VecDeque<AppResult<()>>>,
    delay: Duration,
}

impl RecordingEndpoint {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn then(self, response: AppResult<()>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionEndpoint for RecordingEndpoint {
    async fn post_submission(&self, payload: &SubmissionPayload) -> AppResult<()> {
        self.payloads.lock().unwrap().push(payload.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// 同时扮演摄像头、全屏、可见性
#[derive(Default)]
struct FakeDevice {
    deny_camera: bool,
    live: AtomicBool,
    fullscreen: AtomicBool,
    hidden: AtomicBool,
    releases: AtomicUsize,
}

#[async_trait]
impl CameraCapability for FakeDevice {
    async fn acquire(&self) -> AppResult<StreamHandle> {
        if self.deny_camera {
            return Err(AppError::camera_denied("NotAllowedError"));
        }
        self.live.store(true, Ordering::SeqCst);
        Ok(StreamHandle {
            id: "fake-stream".to_string(),
        })
    }

    async fn is_live(&self) -> AppResult<bool> {
        Ok(self.live.load(Ordering::SeqCst))
    }

    async fn release(&self) -> AppResult<()> {
        self.live.store(false, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl FullscreenCapability for FakeDevice {
    async fn request_fullscreen(&self) -> AppResult<bool> {
        self.fullscreen.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn is_fullscreen(&self) -> AppResult<bool> {
        Ok(self.fullscreen.load(Ordering::SeqCst))
    }

    async fn exit_fullscreen(&self) -> AppResult<()> {
        self.fullscreen.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl VisibilityCapability for FakeDevice {
    async fn is_visible(&self) -> AppResult<bool> {
        Ok(!self.hidden.load(Ordering::SeqCst))
    }
}

/// 记录渲染过的阶段和收到的提示
#[derive(Default)]
struct RecordingPresenter {
    phases: Vec<Phase>,
    notices: Vec<Notice>,
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, view: &SessionView) {
        if self.phases.last() != Some(&view.phase) {
            self.phases.push(view.phase);
        }
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

// ========== 组装 ==========

fn ctx() -> SessionContext {
    SessionContext::new(
        CandidateInfo {
            candidate_name: "Asha".to_string(),
            father_name: "Ravi".to_string(),
            mobile_number: "9876543210".to_string(),
        },
        "PY101",
        "en",
    )
}

struct Harness {
    store: Arc<MemoryStore>,
    questions: Arc<FakeQuestions>,
    endpoint: Arc<RecordingEndpoint>,
    device: Arc<FakeDevice>,
}

impl Harness {
    fn new(questions: FakeQuestions, endpoint: RecordingEndpoint, device: FakeDevice) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            questions: Arc::new(questions),
            endpoint: Arc::new(endpoint),
            device: Arc::new(device),
        }
    }

    fn runner(&self, budget_secs: u32) -> SessionRunner {
        let answers = AnswerStore::open(self.store.clone(), &ctx()).unwrap();
        let controller = ExamSessionController::new(ctx(), answers, budget_secs, ViolationPolicy::warn_only());
        let monitor = CapabilityMonitor::new(
            self.device.clone(),
            self.device.clone(),
            self.device.clone(),
            Duration::from_millis(250),
        );
        SessionRunner::new(
            controller,
            SessionDeps {
                questions: self.questions.clone(),
                submission: Arc::new(SubmissionService::new(
                    self.endpoint.clone(),
                    Duration::from_secs(15),
                )),
                monitor,
            },
        )
    }
}

async fn run(runner: SessionRunner, commands: mpsc::UnboundedReceiver<UserCommand>) -> (SessionReport, RecordingPresenter) {
    let mut presenter = RecordingPresenter::default();
    let report = runner.run(commands, &mut presenter).await;
    (report, presenter)
}

// ========== 场景 ==========

#[tokio::test(start_paused = true)]
async fn test_time_expiry_submits_last_answers_once() {
    let harness = Harness::new(
        FakeQuestions::with_ids(&[1, 2]),
        RecordingEndpoint::default(),
        FakeDevice::default(),
    );
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        tx.send(UserCommand::Select {
            index: 0,
            option: OptionLabel::A,
        })
        .unwrap();
        tx.send(UserCommand::Next).unwrap();
    });

    let (report, presenter) = run(harness.runner(60), rx).await;

    let payloads = harness.endpoint.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        payloads[0].answers,
        vec![SubmittedAnswer {
            question_id: 1,
            selected_option: OptionLabel::A,
        }]
    );
    assert_eq!(payloads[0].reason, SubmitReason::TimeExpired);
    assert_eq!(payloads[0].time_taken_minutes, 1);

    assert_eq!(report.phase, Phase::Completed);
    assert_eq!(
        presenter.phases,
        vec![Phase::Bootstrapping, Phase::Active, Phase::Finalizing, Phase::Completed]
    );
    assert_eq!(harness.questions.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.device.releases.load(Ordering::SeqCst), 1);
    assert!(!harness.device.fullscreen.load(Ordering::SeqCst));
    assert_eq!(assert_ok!(harness.store.get("answers_PY101_en")), None);
}

#[tokio::test(start_paused = true)]
async fn test_camera_denied_never_becomes_active() {
    let harness = Harness::new(
        FakeQuestions::with_ids(&[1, 2]),
        RecordingEndpoint::default(),
        FakeDevice {
            deny_camera: true,
            ..FakeDevice::default()
        },
    );
    let (_tx, rx) = mpsc::unbounded_channel();

    let (report, presenter) = run(harness.runner(60), rx).await;

    assert!(!presenter.phases.contains(&Phase::Active));
    let payloads = harness.endpoint.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].reason, SubmitReason::CameraDenied);
    assert!(payloads[0].answers.is_empty());
    assert_eq!(report.reason, Some(SubmitReason::CameraDenied));
    assert_eq!(report.phase, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_camera_revoked_mid_session_forces_submission() {
    let harness = Harness::new(
        FakeQuestions::with_ids(&[1, 2]),
        RecordingEndpoint::default(),
        FakeDevice::default(),
    );
    let device = harness.device.clone();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        // 作答跟随排在它前面的翻页
        tx.send(UserCommand::Next).unwrap();
        tx.send(UserCommand::Answer(OptionLabel::C)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        device.live.store(false, Ordering::SeqCst);
    });

    let (report, presenter) = run(harness.runner(600), rx).await;

    let payloads = harness.endpoint.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].reason, SubmitReason::CameraDenied);
    assert_eq!(
        payloads[0].answers,
        vec![SubmittedAnswer {
            question_id: 2,
            selected_option: OptionLabel::C,
        }]
    );
    assert_eq!(report.phase, Phase::Completed);
    assert_eq!(report.reason, Some(SubmitReason::CameraDenied));
    assert_eq!(
        presenter.phases,
        vec![Phase::Bootstrapping, Phase::Active, Phase::Finalizing, Phase::Completed]
    );
    assert!(presenter
        .notices
        .iter()
        .any(|n| n.message == "Camera access is required for this exam"));
}

#[tokio::test(start_paused = true)]
async fn test_expiry_and_manual_submit_in_same_instant() {
    let harness = Harness::new(
        FakeQuestions::with_ids(&[1]),
        RecordingEndpoint::with_delay(Duration::from_secs(3)),
        FakeDevice::default(),
    );
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let _ = tx.send(UserCommand::Submit);
        let _ = tx.send(UserCommand::Quit);
    });

    let (report, _) = run(harness.runner(5), rx).await;

    assert_eq!(harness.endpoint.payloads().len(), 1);
    assert_eq!(report.submission_attempts, 1);
    assert!(matches!(
        report.reason,
        Some(SubmitReason::TimeExpired) | Some(SubmitReason::ManualSubmit)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_transient_failure() {
    let harness = Harness::new(
        FakeQuestions::with_ids(&[1, 2]),
        RecordingEndpoint::default().then(Err(ApiError::BadResponse {
            endpoint: "api/exam/submit".to_string(),
            status: 503,
            message: None,
        }
        .into())),
        FakeDevice::default(),
    );
    let runner = harness.runner(600);
    let mut phases = runner.subscribe_phase();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        tx.send(UserCommand::Select {
            index: 1,
            option: OptionLabel::D,
        })
        .unwrap();
        tx.send(UserCommand::Submit).unwrap();

        phases
            .wait_for(|p| *p == Phase::Failed(FailureCause::SubmissionRetryable))
            .await
            .unwrap();
        tx.send(UserCommand::Submit).unwrap();
    });

    let (report, presenter) = run(runner, rx).await;

    let payloads = harness.endpoint.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
    assert_eq!(payloads[1].reason, SubmitReason::ManualSubmit);
    assert_eq!(report.phase, Phase::Completed);
    assert!(presenter.notices.iter().any(|n| n.message == "Submission failed"));
    // 第一次失败时摄像头没有被释放
    assert_eq!(harness.device.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_ends_session_without_submission() {
    let harness = Harness::new(
        FakeQuestions::failing(),
        RecordingEndpoint::default(),
        FakeDevice::default(),
    );
    let (_tx, rx) = mpsc::unbounded_channel();

    let (report, presenter) = run(harness.runner(60), rx).await;

    assert_eq!(report.phase, Phase::Failed(FailureCause::LoadError));
    assert!(harness.endpoint.payloads().is_empty());
    assert!(presenter.notices.iter().any(|n| n.message == "Failed to load exam"));
    assert!(!harness.device.live.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_violations_warn_without_ending_session() {
    let harness = Harness::new(
        FakeQuestions::with_ids(&[1]),
        RecordingEndpoint::default(),
        FakeDevice::default(),
    );
    let device = harness.device.clone();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        device.hidden.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        device.hidden.store(false, Ordering::SeqCst);
        device.fullscreen.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(UserCommand::Submit).unwrap();
    });

    let (report, presenter) = run(harness.runner(600), rx).await;

    assert_eq!(report.phase, Phase::Completed);
    assert_eq!(report.violations, 2);
    assert_eq!(harness.endpoint.payloads()[0].reason, SubmitReason::ManualSubmit);
    let messages: Vec<_> = presenter.notices.iter().map(|n| n.message.as_str()).collect();
    assert!(messages.contains(&"Tab switching is not allowed during the exam"));
    assert!(messages.contains(&"Please stay in full screen during the exam"));
}

#[test]
fn test_draft_survives_reload_on_disk() {
    let dir = std::env::temp_dir().join(format!("proctored_exam_{}", uuid::Uuid::new_v4()));
    let store: Arc<dyn DurableStore> = Arc::new(FileStore::open(&dir).unwrap());

    let mut answers = AnswerStore::open(store.clone(), &ctx()).unwrap();
    assert_ok!(answers.set(3, OptionLabel::B));
    assert_ok!(answers.set(5, OptionLabel::C));
    drop(answers);

    let reopened_store: Arc<dyn DurableStore> = Arc::new(FileStore::open(&dir).unwrap());
    let reopened = AnswerStore::open(reopened_store, &ctx()).unwrap();
    assert_eq!(reopened.record().get(3), Some(OptionLabel::B));
    assert_eq!(reopened.record().get(5), Some(OptionLabel::C));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_candidate_blocks_session() {
    let store = MemoryStore::new();
    assert_err!(SessionContext::from_store(&store, "PY101", "en"));
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    proctored_exam::utils::logging::init(true);

    let config = proctored_exam::Config::from_env();
    let result = proctored_exam::connect_to_browser_and_page(
        config.browser_debug_port,
        Some(&config.proctor_page_url),
    )
    .await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}
