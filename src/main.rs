use std::path::PathBuf;

use anyhow::Result;
use proctored_exam::config::Config;
use proctored_exam::orchestrator::App;
use proctored_exam::utils::logging;
use proctored_exam::Phase;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（EXAM_CONFIG 指向可选的 TOML 文件）
    let config_path = std::env::var("EXAM_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let report = App::initialize(config).await?.run().await?;

    // 未成功交卷时以非零状态退出
    if report.phase != Phase::Completed {
        std::process::exit(1);
    }

    Ok(())
}
