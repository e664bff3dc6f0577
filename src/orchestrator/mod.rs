//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把控制器接到真实的异步世界里，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 管理浏览器资源（Browser、JsExecutor）
//! - 组装后端客户端、监考页面、服务和控制器
//!
//! ### `session_runner` - 会话运行器
//! - 单一事件队列，串行驱动控制器
//! - 执行控制器返回的副作用（节拍、提交、释放资源、提示）
//! - 对外提供阶段订阅
//!
//! ### `console` - 终端界面
//! - 解析考生命令
//! - 渲染题目、题号面板和提示
//!
//! ## 层次关系
//!
//! ```text
//! app (组装依赖、持有 Browser)
//!     ↓
//! session_runner (事件循环)
//!     ↓
//! workflow::ExamSessionController (状态机)
//!     ↓
//! services (能力层：倒计时 / 草稿 / 监考 / 提交)
//!     ↓
//! infrastructure (基础设施：JsExecutor / DurableStore)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 Browser
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度，所有判断都在控制器里

pub mod app;
pub mod console;
pub mod session_runner;

// 重新导出主要类型
pub use app::App;
pub use console::{parse_command, ConsolePresenter};
pub use session_runner::{Presenter, SessionDeps, SessionReport, SessionRunner};
