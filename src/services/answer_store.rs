//! 答题草稿服务 - 业务能力层
//!
//! 只负责"记住考生选了什么"，每次修改同步落盘

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::infrastructure::DurableStore;
use crate::models::{AnswerRecord, OptionLabel, QuestionId, QuestionSet, SessionContext};

/// `set` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// 记录发生变化并已持久化
    Changed(AnswerRecord),
    /// 与已有答案相同，未写盘
    Unchanged,
}

/// 答题草稿存储
///
/// 职责：
/// - 独占 `answers_<examCode>_<lang>` 这个键
/// - 先落盘再更新内存，落盘失败时内存保持原样
/// - 只在确认提交成功后清空
pub struct AnswerStore {
    store: Arc<dyn DurableStore>,
    key: String,
    record: AnswerRecord,
}

impl AnswerStore {
    /// 打开草稿，若存在上次未提交的草稿则恢复
    pub fn open(store: Arc<dyn DurableStore>, ctx: &SessionContext) -> AppResult<Self> {
        let mut answer_store = Self {
            store,
            key: ctx.draft_key(),
            record: AnswerRecord::new(),
        };
        answer_store.record = answer_store.load()?;
        if !answer_store.record.is_empty() {
            info!(
                "📂 恢复答题草稿: {} 道题已作答 ({})",
                answer_store.record.len(),
                answer_store.key
            );
        }
        Ok(answer_store)
    }

    /// 读取已持久化的草稿；不存在或无法解析时返回空记录
    pub fn load(&self) -> AppResult<AnswerRecord> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(AnswerRecord::new());
        };
        match serde_json::from_str::<AnswerRecord>(&raw) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!("⚠️ 草稿 {} 无法解析，按空草稿处理: {}", self.key, e);
                Ok(AnswerRecord::new())
            }
        }
    }

    /// 记录一道题的答案，返回后保证已落盘
    pub fn set(&mut self, question_id: QuestionId, option: OptionLabel) -> AppResult<SetOutcome> {
        if self.record.get(question_id) == Some(option) {
            debug!("题目 {} 重复选择 {}，忽略", question_id, option);
            return Ok(SetOutcome::Unchanged);
        }

        let mut next = self.record.clone();
        next.insert(question_id, option);
        self.persist(&next)?;
        self.record = next;

        debug!("题目 {} 选择 {} 已保存", question_id, option);
        Ok(SetOutcome::Changed(self.record.clone()))
    }

    /// 丢弃不属于本场考试的草稿条目，返回丢弃数量
    pub fn retain_known(&mut self, questions: &QuestionSet) -> AppResult<usize> {
        let mut next = self.record.clone();
        let dropped = next.retain_known(questions);
        if dropped > 0 {
            warn!("⚠️ 草稿中有 {} 道题不在本场考试中，已丢弃", dropped);
            self.persist(&next)?;
            self.record = next;
        }
        Ok(dropped)
    }

    /// 清空草稿（仅在提交成功后调用）
    pub fn clear(&mut self) -> AppResult<()> {
        self.store.delete(&self.key)?;
        self.record = AnswerRecord::new();
        info!("🧹 已清除答题草稿 {}", self.key);
        Ok(())
    }

    pub fn record(&self) -> &AnswerRecord {
        &self.record
    }

    fn persist(&self, record: &AnswerRecord) -> AppResult<()> {
        let json = serde_json::to_string(record)?;
        self.store.set(&self.key, &json)
    }
}
