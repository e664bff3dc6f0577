//! 题目加载服务 - 业务能力层
//!
//! 只负责"获取本场考试的题目"，每个会话只调用一次

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{AppResult, SessionError};
use crate::models::{Question, QuestionSet, SessionContext};

/// 题目来源
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch_questions(&self, ctx: &SessionContext) -> AppResult<Vec<Question>>;
}

/// 拉取题目并构造不可变的题目集合
///
/// 空列表视为加载失败：没有题目的考试无法进行。
pub async fn load_question_set(source: &dyn QuestionSource, ctx: &SessionContext) -> AppResult<QuestionSet> {
    info!("📥 正在加载考试 {} ({}) 的题目...", ctx.exam_code, ctx.language);

    let questions = source.fetch_questions(ctx).await.map_err(|e| {
        warn!("❌ 题目加载失败: {}", e);
        e
    })?;

    if questions.is_empty() {
        warn!("❌ 考试 {} 没有返回任何题目", ctx.exam_code);
        return Err(SessionError::NoQuestions {
            exam_code: ctx.exam_code.clone(),
        }
        .into());
    }

    info!("✓ 成功加载 {} 道题目", questions.len());
    Ok(QuestionSet::new(questions))
}
