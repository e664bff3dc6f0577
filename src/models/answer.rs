use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::question::{OptionLabel, QuestionId, QuestionSet};

/// 题目 ID → 所选选项
///
/// 每道题最多一条记录，不存在即“未作答”。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerRecord(BTreeMap<QuestionId, OptionLabel>);

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: QuestionId) -> Option<OptionLabel> {
        self.0.get(&id).copied()
    }

    pub fn insert(&mut self, id: QuestionId, option: OptionLabel) -> Option<OptionLabel> {
        self.0.insert(id, option)
    }

    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, OptionLabel)> + '_ {
        self.0.iter().map(|(id, opt)| (*id, *opt))
    }

    /// 只保留题目集合中存在的记录，返回被移除的数量
    pub fn retain_known(&mut self, questions: &QuestionSet) -> usize {
        let before = self.0.len();
        self.0.retain(|id, _| questions.contains(*id));
        before - self.0.len()
    }

    /// 按题目顺序输出作答；没有题目集合时按 ID 升序
    pub fn ordered(&self, questions: Option<&QuestionSet>) -> Vec<(QuestionId, OptionLabel)> {
        match questions {
            Some(set) => set
                .iter()
                .filter_map(|q| self.get(q.id).map(|opt| (q.id, opt)))
                .collect(),
            None => self.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;

    fn set(ids: &[QuestionId]) -> QuestionSet {
        QuestionSet::new(
            ids.iter()
                .map(|id| Question {
                    id: *id,
                    question_text: String::new(),
                    option_a: String::new(),
                    option_b: String::new(),
                    option_c: String::new(),
                    option_d: String::new(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_ordered_follows_question_order() {
        let mut record = AnswerRecord::new();
        record.insert(5, OptionLabel::C);
        record.insert(2, OptionLabel::A);

        let questions = set(&[5, 9, 2]);
        assert_eq!(
            record.ordered(Some(&questions)),
            vec![(5, OptionLabel::C), (2, OptionLabel::A)]
        );
        assert_eq!(
            record.ordered(None),
            vec![(2, OptionLabel::A), (5, OptionLabel::C)]
        );
    }

    #[test]
    fn test_retain_known_drops_foreign_keys() {
        let mut record = AnswerRecord::new();
        record.insert(1, OptionLabel::A);
        record.insert(42, OptionLabel::B);

        assert_eq!(record.retain_known(&set(&[1, 2])), 1);
        assert!(record.is_answered(1));
        assert!(!record.is_answered(42));
    }

    #[test]
    fn test_json_shape_is_plain_object() {
        let mut record = AnswerRecord::new();
        record.insert(3, OptionLabel::D);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"3":"D"}"#);
        let back: AnswerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
