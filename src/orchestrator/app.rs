//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：连接浏览器、创建 JsExecutor、打开本地存储
//! 2. **组装依赖**：后端客户端、监考页面、各项服务、控制器
//! 3. **资源管理**：唯一持有 Browser 的模块
//! 4. **运行会话**：把终端界面接到会话运行器上

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::info;

use crate::browser;
use crate::clients::{ExamApiClient, ProctorPage};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{DurableStore, FileStore, JsExecutor};
use crate::models::SessionContext;
use crate::orchestrator::console::{spawn_stdin_commands, ConsolePresenter};
use crate::orchestrator::session_runner::{SessionDeps, SessionReport, SessionRunner};
use crate::services::{AnswerStore, CapabilityMonitor, SubmissionService};
use crate::workflow::{ExamSessionController, ViolationPolicy};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    executor: Arc<JsExecutor>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        // 连接浏览器
        let (browser, page) = browser::connect_to_browser_and_page(
            config.browser_debug_port,
            Some(&config.proctor_page_url),
        )
        .await?;

        // 创建 JsExecutor（持有 page）
        let executor = Arc::new(JsExecutor::new(page));

        Ok(Self {
            config,
            _browser: browser,
            executor,
        })
    }

    /// 运行一次考试会话
    pub async fn run(&self) -> Result<SessionReport> {
        let store: Arc<dyn DurableStore> = Arc::new(
            FileStore::open(Path::new(&self.config.storage_dir)).context("无法打开本地存储")?,
        );

        // 考生信息由考前登记页面写入，缺失时无法开始
        let ctx = SessionContext::from_store(store.as_ref(), &self.config.exam_code, &self.config.language)
            .context("考生信息无效，请先完成考生信息登记")?;
        let answers = AnswerStore::open(store, &ctx)?;

        let api = Arc::new(ExamApiClient::new(&self.config)?);
        let proctor = Arc::new(ProctorPage::new(self.executor.clone()));
        let monitor = CapabilityMonitor::new(
            proctor.clone(),
            proctor.clone(),
            proctor,
            Duration::from_millis(self.config.probe_interval_ms),
        );
        let submission = Arc::new(SubmissionService::new(
            api.clone(),
            Duration::from_secs(self.config.submit_timeout_secs),
        ));

        let controller = ExamSessionController::new(
            ctx,
            answers,
            self.config.exam_duration_secs,
            self.violation_policy()?,
        );
        let runner = SessionRunner::new(
            controller,
            SessionDeps {
                questions: api,
                submission,
                monitor,
            },
        );

        let commands = spawn_stdin_commands();
        let mut presenter = ConsolePresenter::new();

        let report = runner.run(commands, &mut presenter).await;
        Ok(report)
    }

    fn violation_policy(&self) -> AppResult<ViolationPolicy> {
        match self.config.violation_limit {
            Some(limit) if limit > 0 => Ok(ViolationPolicy::with_limit(
                limit,
                self.config.violation_window()?,
            )),
            _ => Ok(ViolationPolicy::warn_only()),
        }
    }
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🎓 远程监考考试客户端");
    info!("{}", "=".repeat(60));
    info!("后端地址: {}", config.api_base_url);
    info!("考试代码: {} ({})", config.exam_code, config.language);
    info!("浏览器调试端口: {}", config.browser_debug_port);
    match config.violation_limit {
        Some(limit) if limit > 0 => info!(
            "违规策略: {} 秒内 {} 次强制交卷",
            config.violation_window_secs, limit
        ),
        _ => info!("违规策略: 仅警告"),
    }
    info!("{}", "=".repeat(60));
}
