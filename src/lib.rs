//! # Proctored Exam
//!
//! 一个运行单场限时远程监考考试的 Rust 客户端
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `DurableStore` - 键值持久化（答题草稿、考生信息）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Countdown` / `Ticker` - 倒计时
//! - `AnswerStore` - 答题草稿
//! - `CapabilityMonitor` - 摄像头 / 全屏 / 可见性监考信号
//! - `SubmissionService` - 提交与结果分类
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一场考试"的状态机
//! - `ExamSessionController` - 唯一的状态修改点
//! - `ViolationPolicy` - 非致命违规策略
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session_runner` - 事件循环，执行控制器的副作用
//! - `orchestrator/app` - 组装依赖，管理浏览器资源
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{Phase, SessionContext, SubmitReason};
pub use orchestrator::{App, SessionReport, SessionRunner};
pub use workflow::ExamSessionController;
