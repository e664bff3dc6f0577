/// 日志工具模块
///
/// 提供日志初始化和考试过程中的格式化输出
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{Phase, SessionContext};

/// 初始化 tracing 订阅器
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录会话启动信息
///
/// # 参数
/// - `ctx`: 会话上下文
/// - `budget_secs`: 考试总时长
pub fn log_session_start(ctx: &SessionContext, budget_secs: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 考试会话启动 - {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("📋 考试: {} | 语言: {}", ctx.exam_code, ctx.language);
    info!("👤 考生: {}", ctx.candidate.candidate_name);
    info!("⏱ 时长: {} 分钟", budget_secs / 60);
    info!("{}", "=".repeat(60));
}

/// 记录阶段切换
pub fn log_phase_change(from: Phase, to: Phase) {
    info!("🔄 阶段切换: {} → {}", from, to);
}

/// 打印会话结束统计
///
/// # 参数
/// - `phase`: 最终阶段
/// - `answered`: 已作答题数
/// - `total`: 题目总数
/// - `violations`: 违规次数
pub fn print_final_summary(phase: Phase, answered: usize, total: usize, violations: u32) {
    info!("\n{}", "=".repeat(60));
    info!("📊 考试会话结束");
    info!("完成时间: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("📌 最终阶段: {}", phase);
    info!("✅ 已作答: {}/{}", answered, total);
    info!("⚠️ 违规次数: {}", violations);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
