//! 终端界面
//!
//! 命令：
//! - `n` / `p`：下一题 / 上一题
//! - `g <k>`：跳到第 k 题（从 1 开始）
//! - `a <A-D>`：作答当前题
//! - `s`：交卷（提交失败后为重试）
//! - `q`：放弃考试并交卷
//! - `x`：提交失败后离开

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

use crate::models::{FailureCause, OptionLabel, Phase, UserCommand};
use crate::orchestrator::session_runner::Presenter;
use crate::workflow::{Notice, NoticeLevel, PaletteStatus, SessionView};

/// 解析一行输入
///
/// # 参数
/// - `line`: 用户输入
///
/// # 返回
/// 空行返回 `Ok(None)`，无法识别时返回错误说明
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let command = match (head.to_ascii_lowercase().as_str(), arg) {
        ("n", None) => UserCommand::Next,
        ("p", None) => UserCommand::Prev,
        ("s", None) => UserCommand::Submit,
        ("q", None) => UserCommand::Quit,
        ("x", None) => UserCommand::Leave,
        ("g", Some(k)) => {
            let k: usize = k.parse().map_err(|_| format!("题号无效: {}", k))?;
            UserCommand::GoTo(k.saturating_sub(1))
        }
        ("a", Some(option)) => {
            let option: OptionLabel = option.parse().map_err(|e: crate::error::SessionError| e.to_string())?;
            UserCommand::Answer(option)
        }
        _ => return Err(format!("无法识别的命令: {}", line.trim())),
    };
    Ok(Some(command))
}

/// 从标准输入读取命令
pub fn spawn_stdin_commands() -> UnboundedReceiver<UserCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Some(command)) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("⚠️ {}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("读取标准输入失败: {}", e);
                    break;
                }
            }
        }
        debug!("标准输入已关闭");
    });
    rx
}

/// 终端界面
#[derive(Default)]
pub struct ConsolePresenter {
    last_screen: Option<(Phase, usize, Option<OptionLabel>, usize)>,
    last_minute: Option<u32>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn print_question(&self, view: &SessionView) {
        let Some(question) = &view.question else {
            return;
        };
        println!("\n{}", "-".repeat(60));
        println!(
            "第 {}/{} 题 | 已作答 {} | 剩余 {}",
            view.current_index + 1,
            view.total,
            view.answered,
            format_remaining(view.remaining_secs)
        );
        println!("{}", question.question_text);
        for label in OptionLabel::ALL {
            let marker = if view.selected == Some(label) { "●" } else { "○" };
            println!("  {} {}. {}", marker, label, question.option(label));
        }
        println!("{}", render_palette(view));
    }
}

impl Presenter for ConsolePresenter {
    fn render(&mut self, view: &SessionView) {
        let screen = (view.phase, view.current_index, view.selected, view.answered);
        if self.last_screen != Some(screen) {
            self.last_screen = Some(screen);
            match view.phase {
                Phase::Active => self.print_question(view),
                Phase::Finalizing => println!("📤 正在提交答卷..."),
                Phase::Failed(FailureCause::SubmissionRetryable) => {
                    println!("❌ 提交失败，输入 s 重试，x 离开")
                }
                Phase::Failed(FailureCause::SubmissionRejected) => {
                    println!("⛔ 答卷被拒绝，无法重试，作答草稿已保留在本机")
                }
                _ => {}
            }
            return;
        }

        if view.phase == Phase::Active {
            let minute = view.remaining_secs / 60;
            if view.remaining_secs <= 10 || self.last_minute != Some(minute) {
                self.last_minute = Some(minute);
                println!("⏱ 剩余 {}", format_remaining(view.remaining_secs));
            }
        }
    }

    fn notify(&mut self, notice: &Notice) {
        let icon = match notice.level {
            NoticeLevel::Info => "ℹ️",
            NoticeLevel::Warning => "⚠️",
            NoticeLevel::Error => "❌",
        };
        println!("{} {}", icon, notice.message);
    }
}

/// mm:ss
pub fn format_remaining(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// 题号面板：`[3]` 当前题，`✓` 已答，`·` 看过未答，空格 未访问
pub fn render_palette(view: &SessionView) -> String {
    view.palette
        .iter()
        .map(|entry| {
            let mark = match entry.status {
                PaletteStatus::Answered => '✓',
                PaletteStatus::VisitedUnanswered => '·',
                PaletteStatus::Unvisited => ' ',
            };
            if entry.current {
                format!("[{}{}]", entry.index + 1, mark)
            } else {
                format!(" {}{} ", entry.index + 1, mark)
            }
        })
        .collect::<Vec<_>>()
        .join("")
}
